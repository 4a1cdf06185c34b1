use crate::state::CandidateKind;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Live, process-wide configuration handle.
///
/// Created once at the composition root. Readers take a snapshot with
/// `load()`; writers publish a whole new config with `store()`, which is
/// picked up by the next scoring call.
pub type SharedConfig = Arc<ArcSwap<NoemaConfig>>;

/// Wrap a config into a [`SharedConfig`] handle.
pub fn shared(config: NoemaConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoemaConfig {
    pub kernel: KernelConfig,
    pub gate: GateConfig,
    pub limbic: HomeostasisConfig,
    pub volition: VolitionConfig,
    pub ledger: LedgerConfig,
    pub embeddings: EmbeddingsConfig,
}

impl NoemaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: NoemaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file is missing or invalid, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NOEMA_SEED") {
            self.kernel.seed = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = std::env::var("NOEMA_AGENT_ID") {
            if !v.trim().is_empty() {
                self.kernel.agent_id = v;
            }
        }
        if let Ok(v) = std::env::var("NOEMA_TICK_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.kernel.tick_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("NOEMA_PROVIDER_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.kernel.provider_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("NOEMA_RECENCY_DECAY_MS") {
            if let Ok(n) = v.parse() {
                self.gate.recency_decay_ms = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub tick_interval_ms: u64,
    /// Maximum number of conversation turns retained (oldest dropped first).
    pub conversation_limit: usize,
    /// Maximum number of recorded thoughts retained (oldest dropped first).
    pub thought_limit: usize,
    /// Upper bound for any single collaborator call made from within a tick.
    pub provider_timeout_ms: u64,
    /// Seed for deterministic replay. `None` uses the ambient random source.
    pub seed: Option<String>,
    pub agent_id: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            conversation_limit: 40,
            thought_limit: 20,
            provider_timeout_ms: 5000,
            seed: None,
            agent_id: "noema".to_string(),
        }
    }
}

impl KernelConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms.max(1))
    }
}

/// Weights consumed by the executive gate on every scoring call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Candidate type → goal relevance weight in [0, 1].
    pub goal_relevance_weights: HashMap<CandidateKind, f64>,
    /// Decay constant for the recency factor, in milliseconds.
    pub recency_decay_ms: f64,
    /// Minimum strength for a candidate to enter working attention.
    pub attention_threshold: f64,
    /// Maximum number of candidates held in working attention.
    pub attention_capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        let goal_relevance_weights = HashMap::from([
            (CandidateKind::GoalDriven, 1.0),
            (CandidateKind::UserInput, 1.0),
            (CandidateKind::Autonomous, 0.6),
            (CandidateKind::Memory, 0.4),
        ]);
        Self {
            goal_relevance_weights,
            recency_decay_ms: 10_000.0,
            attention_threshold: 0.15,
            attention_capacity: 3,
        }
    }
}

impl GateConfig {
    /// Weight for a candidate type; unknown types carry no goal relevance.
    pub fn weight_for(&self, kind: CandidateKind) -> f64 {
        self.goal_relevance_weights
            .get(&kind)
            .copied()
            .filter(|w| w.is_finite())
            .unwrap_or(0.0)
    }
}

/// Homeostasis tunables: per-tick pull toward a fixed baseline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomeostasisConfig {
    /// Fraction of the distance to baseline recovered per tick, in (0, 1].
    pub decay_rate: f64,
    pub fear_baseline: f64,
    pub curiosity_baseline: f64,
    pub satisfaction_baseline: f64,
    pub frustration_baseline: f64,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.05,
            fear_baseline: 0.1,
            curiosity_baseline: 0.5,
            satisfaction_baseline: 0.5,
            frustration_baseline: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolitionConfig {
    /// Minimum time between two speech acts.
    pub refractory_ms: i64,
    /// Base urge required to speak.
    pub urge_threshold: f64,
    /// Upper bound of the silence bonus.
    pub silence_bonus_max: f64,
    /// Silence length at which half of the bonus is reached.
    pub silence_half_saturation_ms: f64,
    /// Threshold reduction at full frustration.
    pub frustration_threshold_relief: f64,
    /// Threshold increase at full fear.
    pub fear_threshold_penalty: f64,
    /// Threshold increase when the content repeats a recent output.
    pub repetition_penalty: f64,
    /// Threshold increase for self-initiated speech.
    pub autonomous_threshold_penalty: f64,
}

impl Default for VolitionConfig {
    fn default() -> Self {
        Self {
            refractory_ms: 3000,
            urge_threshold: 0.6,
            silence_bonus_max: 0.4,
            silence_half_saturation_ms: 60_000.0,
            frustration_threshold_relief: 0.15,
            fear_threshold_penalty: 0.1,
            repetition_penalty: 0.25,
            autonomous_threshold_penalty: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Size of the recent-entries ring kept for telemetry display.
    pub recent_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { recent_capacity: 50 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Consecutive failures before the cooldown engages.
    pub cooldown_after_failures: u32,
    pub cooldown_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            cooldown_after_failures: 3,
            cooldown_secs: 30,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
