//! Executive gate: what enters working attention.
//!
//! Strength blends goal relevance, recency, novelty and salience. The gate
//! never caches configuration; every call reads the `GateConfig` it is
//! handed, so a swapped config is in effect on the next call.

use noema_core::{CandidateKind, GateConfig};
use serde::{Deserialize, Serialize};

const GOAL_SHARE: f64 = 0.2;
const RECENCY_SHARE: f64 = 0.1;
const NOVELTY_SHARE: f64 = 0.35;
const SALIENCE_SHARE: f64 = 0.35;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    /// [0, 1]
    pub novelty: f64,
    /// [0, 1]
    pub salience: f64,
}

/// Ephemeral unit of attention, produced and scored within one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: CandidateKind,
    /// Unix milliseconds
    pub timestamp: i64,
    pub metadata: CandidateMetadata,
    /// What the candidate refers to (goal id, autonomy intention, input text).
    pub label: String,
}

impl Candidate {
    pub fn new(kind: CandidateKind, timestamp: i64, label: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp,
            metadata: CandidateMetadata::default(),
            label: label.into(),
        }
    }

    pub fn with_metadata(mut self, novelty: f64, salience: f64) -> Self {
        self.metadata = CandidateMetadata { novelty, salience };
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub strength: f64,
}

/// 1 at zero age, approaching 0 once age is well past `decay_ms`.
/// Future timestamps count as zero age.
pub fn recency_factor(timestamp: i64, now: i64, decay_ms: f64) -> f64 {
    let age = now.saturating_sub(timestamp).max(0) as f64;
    if !(decay_ms.is_finite() && decay_ms > 0.0) {
        return if age == 0.0 { 1.0 } else { 0.0 };
    }
    (-age / decay_ms).exp()
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub struct ExecutiveGate;

impl ExecutiveGate {
    pub fn compute_candidate_strength(candidate: &Candidate, now: i64, config: &GateConfig) -> f64 {
        let weight = config.weight_for(candidate.kind);
        let recency = recency_factor(candidate.timestamp, now, config.recency_decay_ms);
        let strength = GOAL_SHARE * weight
            + RECENCY_SHARE * recency
            + NOVELTY_SHARE * unit(candidate.metadata.novelty)
            + SALIENCE_SHARE * unit(candidate.metadata.salience);
        tracing::trace!(
            "ExecutiveGate: {:?} '{}' weight={:.2} recency={:.3} -> {:.3}",
            candidate.kind,
            candidate.label,
            weight,
            recency,
            strength
        );
        strength
    }

    /// Candidates at or above the attention threshold, strongest first,
    /// truncated to the attention capacity. Ties keep input order.
    pub fn select_for_attention(
        candidates: Vec<Candidate>,
        now: i64,
        config: &GateConfig,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let strength = Self::compute_candidate_strength(&candidate, now, config);
                ScoredCandidate { candidate, strength }
            })
            .filter(|s| s.strength >= config.attention_threshold)
            .collect();
        scored.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        scored.truncate(config.attention_capacity);
        scored
    }
}
