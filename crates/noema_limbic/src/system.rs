//! Core limbic regulation
//!
//! Each tick pulls every emotional scalar a fixed fraction of the way back
//! toward its baseline (homeostasis). Tool outcomes push the scalars away
//! from baseline again; the next ticks relax them.

use noema_core::state::clamp_unit;
use noema_core::{HomeostasisConfig, LimbicState};
use serde::{Deserialize, Serialize};

/// Result of a tool invocation, fed back into the limbic state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    Failure,
}

pub struct LimbicSystem {
    config: HomeostasisConfig,
}

impl Default for LimbicSystem {
    fn default() -> Self {
        Self::new(HomeostasisConfig::default())
    }
}

impl LimbicSystem {
    pub fn new(config: HomeostasisConfig) -> Self {
        Self { config }
    }

    pub fn baseline(&self) -> LimbicState {
        LimbicState::new(
            self.config.fear_baseline,
            self.config.curiosity_baseline,
            self.config.satisfaction_baseline,
            self.config.frustration_baseline,
        )
        .clamped()
    }

    /// One homeostatic step. Out-of-range inputs are clamped, not rejected.
    pub fn apply_homeostasis(&self, state: LimbicState) -> LimbicState {
        let rate = if self.config.decay_rate.is_finite() {
            self.config.decay_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let base = self.baseline();
        let relax = |v: f64, b: f64| -> f64 {
            // Clamp first so a wild input cannot overshoot past the baseline.
            let v = clamp_unit(v, b);
            clamp_unit(v + (b - v) * rate, b)
        };
        LimbicState {
            fear: relax(state.fear, base.fear),
            curiosity: relax(state.curiosity, base.curiosity),
            satisfaction: relax(state.satisfaction, base.satisfaction),
            frustration: relax(state.frustration, base.frustration),
        }
    }

    /// Feedback from a tool invocation.
    pub fn apply_action_outcome(&self, state: LimbicState, outcome: ActionOutcome) -> LimbicState {
        let (d_fear, d_curiosity, d_satisfaction, d_frustration) = match outcome {
            ActionOutcome::Success => (-0.02, 0.02, 0.1, -0.05),
            ActionOutcome::Failure => (0.05, -0.02, -0.05, 0.1),
        };
        let next = LimbicState {
            fear: state.fear + d_fear,
            curiosity: state.curiosity + d_curiosity,
            satisfaction: state.satisfaction + d_satisfaction,
            frustration: state.frustration + d_frustration,
        }
        .clamped();
        tracing::trace!("LimbicSystem: {:?} outcome -> {:?}", outcome, next);
        next
    }
}
