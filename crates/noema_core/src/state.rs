//! Turn-level agent state
//!
//! `KernelState` is owned by the reducer. Everything else in the kernel
//! reads snapshots of it; no component mutates it in place.

use crate::trajectory::AgentTrajectory;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Clamp into [0, 1], replacing NaN/Inf with the provided fallback.
#[inline]
pub fn clamp_unit(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        tracing::warn!("NaN/Inf detected in limbic state, resetting to fallback {}", fallback);
        fallback.clamp(0.0, 1.0)
    }
}

// =============================================================================
// Limbic state
// =============================================================================

/// Four bounded emotional scalars, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimbicState {
    pub fear: f64,
    pub curiosity: f64,
    pub satisfaction: f64,
    pub frustration: f64,
}

impl Default for LimbicState {
    fn default() -> Self {
        Self::calm()
    }
}

impl LimbicState {
    pub fn new(fear: f64, curiosity: f64, satisfaction: f64, frustration: f64) -> Self {
        Self {
            fear,
            curiosity,
            satisfaction,
            frustration,
        }
    }

    /// Resting state: low fear/frustration, moderate curiosity/satisfaction.
    pub fn calm() -> Self {
        Self::new(0.1, 0.5, 0.5, 0.1)
    }

    /// Clamp every scalar into [0, 1].
    pub fn clamped(self) -> Self {
        Self {
            fear: clamp_unit(self.fear, 0.0),
            curiosity: clamp_unit(self.curiosity, 0.0),
            satisfaction: clamp_unit(self.satisfaction, 0.0),
            frustration: clamp_unit(self.frustration, 0.0),
        }
    }

    pub fn is_within_bounds(&self) -> bool {
        [self.fear, self.curiosity, self.satisfaction, self.frustration]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

// =============================================================================
// Attention candidates
// =============================================================================

/// Variant set for units of attention scored by the executive gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    GoalDriven,
    Autonomous,
    UserInput,
    Memory,
}

// =============================================================================
// Focus
// =============================================================================

/// What the agent is currently attending to. Either fully set or absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Focus {
    pub domain: String,
    pub id: String,
    pub label: String,
}

impl Focus {
    /// Decode a loosely populated focus. Partial or blank parts mean "unset".
    pub fn from_parts(
        domain: Option<&str>,
        id: Option<&str>,
        label: Option<&str>,
    ) -> Option<Self> {
        fn pick(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|s| !s.is_empty())
        }
        match (pick(domain), pick(id), pick(label)) {
            (Some(domain), Some(id), Some(label)) => Some(Self {
                domain: domain.to_string(),
                id: id.to_string(),
                label: label.to_string(),
            }),
            _ => None,
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    /// Unix milliseconds
    pub at: i64,
}

// =============================================================================
// Goals
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub description: String,
    /// Priority in [0, 1]; used as the candidate's salience.
    pub priority: f64,
    /// Unix milliseconds of the last time the goal was touched.
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalState {
    pub active: Vec<Goal>,
    pub completed: Vec<String>,
}

impl GoalState {
    pub fn find(&self, id: &str) -> Option<&Goal> {
        self.active.iter().find(|g| g.id == id)
    }
}

// =============================================================================
// Kernel state
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelState {
    /// Bounded, oldest first.
    pub conversation: VecDeque<Turn>,
    /// Bounded, oldest first.
    pub thoughts: VecDeque<String>,
    pub limbic: LimbicState,
    pub trajectory: Option<AgentTrajectory>,
    pub focus: Option<Focus>,
    pub goals: GoalState,
    /// Rapport with the current interlocutor, in [0, 1].
    pub resonance: f64,
    pub tick: u64,
    pub sleeping: bool,
    /// Unix milliseconds of the last emitted speech act.
    pub last_speech_at: Option<i64>,
    /// Unix milliseconds of the last stored user input.
    pub last_input_at: Option<i64>,
}

impl Default for KernelState {
    fn default() -> Self {
        Self {
            conversation: VecDeque::new(),
            thoughts: VecDeque::new(),
            limbic: LimbicState::calm(),
            trajectory: None,
            focus: None,
            goals: GoalState::default(),
            resonance: 0.5,
            tick: 0,
            sleeping: false,
            last_speech_at: None,
            last_input_at: None,
        }
    }
}

impl KernelState {
    /// Most recent agent utterances, newest first.
    pub fn recent_outputs(&self, n: usize) -> Vec<String> {
        self.conversation
            .iter()
            .rev()
            .filter(|t| t.speaker == Speaker::Agent)
            .take(n)
            .map(|t| t.text.clone())
            .collect()
    }

    /// Milliseconds since the last turn or agent act, or since
    /// `fallback_since` if there has been neither.
    pub fn silence_ms(&self, now: i64, fallback_since: i64) -> i64 {
        let last_turn = self.conversation.back().map(|t| t.at);
        let last = match (last_turn, self.last_speech_at) {
            (Some(a), Some(b)) => a.max(b),
            (a, b) => a.or(b).unwrap_or(fallback_since),
        };
        now.saturating_sub(last).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_limbic() {
        let s = LimbicState::new(10.0, -5.0, f64::NAN, 0.5).clamped();
        assert_eq!(s.fear, 1.0);
        assert_eq!(s.curiosity, 0.0);
        assert_eq!(s.satisfaction, 0.0);
        assert_eq!(s.frustration, 0.5);
        assert!(s.is_within_bounds());
    }

    #[test]
    fn test_focus_partial_is_unset() {
        assert!(Focus::from_parts(Some("repo"), None, Some("x")).is_none());
        assert!(Focus::from_parts(Some("repo"), Some("  "), Some("x")).is_none());
        let f = Focus::from_parts(Some("repo"), Some("42"), Some("main")).unwrap();
        assert_eq!(f.domain, "repo");
        assert_eq!(f.id, "42");
    }

    #[test]
    fn test_candidate_kind_serde() {
        let json = serde_json::to_string(&CandidateKind::GoalDriven).unwrap();
        assert_eq!(json, "\"goal_driven\"");
    }

    #[test]
    fn test_recent_outputs_newest_first() {
        let mut state = KernelState::default();
        for (i, speaker) in [Speaker::Agent, Speaker::User, Speaker::Agent].iter().enumerate() {
            state.conversation.push_back(Turn {
                speaker: *speaker,
                text: format!("t{}", i),
                at: i as i64,
            });
        }
        assert_eq!(state.recent_outputs(5), vec!["t2".to_string(), "t0".to_string()]);
        assert_eq!(state.silence_ms(10, 0), 8);

        // A later self-initiated act also breaks the silence
        state.last_speech_at = Some(9);
        assert_eq!(state.silence_ms(10, 0), 1);
        assert_eq!(KernelState::default().silence_ms(10, 4), 6);
    }
}
