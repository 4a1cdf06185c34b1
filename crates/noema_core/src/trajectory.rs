//! Self-reported "what next / why" plan, updated by partial patches.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTrajectory {
    pub next_step: Option<String>,
    pub outcome: Option<String>,
    pub friction: Option<String>,
    pub retry_policy: Option<String>,
    /// Unix milliseconds
    pub updated_at: Option<i64>,
    pub tick_number: Option<u64>,
}

/// Field-wise override. `None` leaves the prior value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrajectoryPatch {
    pub next_step: Option<String>,
    pub outcome: Option<String>,
    pub friction: Option<String>,
    pub retry_policy: Option<String>,
}

impl TrajectoryPatch {
    pub fn next_step(step: impl Into<String>) -> Self {
        Self {
            next_step: Some(step.into()),
            ..Default::default()
        }
    }

    /// `other` wins wherever it carries a value.
    pub fn overridden_by(self, other: &TrajectoryPatch) -> Self {
        Self {
            next_step: other.next_step.clone().or(self.next_step),
            outcome: other.outcome.clone().or(self.outcome),
            friction: other.friction.clone().or(self.friction),
            retry_policy: other.retry_policy.clone().or(self.retry_policy),
        }
    }
}

/// Overlay `patch` onto `current` (or an all-empty trajectory) and stamp the
/// call's tick number and time. `now` defaults to the wall clock.
pub fn apply_trajectory_update(
    current: Option<&AgentTrajectory>,
    patch: &TrajectoryPatch,
    tick_number: u64,
    now: Option<i64>,
) -> AgentTrajectory {
    let base = current.cloned().unwrap_or_default();
    AgentTrajectory {
        next_step: patch.next_step.clone().or(base.next_step),
        outcome: patch.outcome.clone().or(base.outcome),
        friction: patch.friction.clone().or(base.friction),
        retry_policy: patch.retry_policy.clone().or(base.retry_policy),
        updated_at: Some(now.unwrap_or_else(|| chrono::Utc::now().timestamp_millis())),
        tick_number: Some(tick_number),
    }
}
