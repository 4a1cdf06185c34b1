//! Self-initiated intentions and their mapping onto dispatchable actions.
//!
//! The mapping is total over [`AutonomyAction`]; anything that does not
//! parse into that closed set is an error, never a default.

use noema_core::{GoalState, LimbicState, NoemaError, NoemaResult, RandomSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutonomyAction {
    ExploreWorld,
    Reflect,
    Rest,
    Plan,
    Socialize,
    Research,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Observe,
    Note,
    Rest,
    Plan,
    Message,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMapping {
    pub action: ActionType,
    /// `autonomy_<snake_case_action>`
    pub reason: String,
}

impl AutonomyAction {
    pub const ALL: [AutonomyAction; 6] = [
        AutonomyAction::ExploreWorld,
        AutonomyAction::Reflect,
        AutonomyAction::Rest,
        AutonomyAction::Plan,
        AutonomyAction::Socialize,
        AutonomyAction::Research,
    ];

    /// Lowercase snake-case name, as used in reason codes.
    pub fn as_snake(&self) -> &'static str {
        match self {
            AutonomyAction::ExploreWorld => "explore_world",
            AutonomyAction::Reflect => "reflect",
            AutonomyAction::Rest => "rest",
            AutonomyAction::Plan => "plan",
            AutonomyAction::Socialize => "socialize",
            AutonomyAction::Research => "research",
        }
    }
}

impl fmt::Display for AutonomyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_snake().to_uppercase())
    }
}

impl FromStr for AutonomyAction {
    type Err = NoemaError;

    /// Accepts `EXPLORE_WORLD` or `explore_world`; nothing else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let is_screaming = trimmed.chars().all(|c| c.is_ascii_uppercase() || c == '_');
        let is_snake = trimmed.chars().all(|c| c.is_ascii_lowercase() || c == '_');
        if !trimmed.is_empty() && (is_screaming || is_snake) {
            let lowered = trimmed.to_ascii_lowercase();
            if let Some(action) = Self::ALL.iter().find(|a| a.as_snake() == lowered) {
                return Ok(*action);
            }
        }
        Err(NoemaError::UnmappedAutonomyAction(s.to_string()))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Observe => "observe",
            ActionType::Note => "note",
            ActionType::Rest => "rest",
            ActionType::Plan => "plan",
            ActionType::Message => "message",
            ActionType::Search => "search",
        };
        f.write_str(s)
    }
}

pub fn map_autonomy_action_to_action_type(action: AutonomyAction) -> ActionMapping {
    let kind = match action {
        AutonomyAction::ExploreWorld => ActionType::Observe,
        AutonomyAction::Reflect => ActionType::Note,
        AutonomyAction::Rest => ActionType::Rest,
        AutonomyAction::Plan => ActionType::Plan,
        AutonomyAction::Socialize => ActionType::Message,
        AutonomyAction::Research => ActionType::Search,
    };
    ActionMapping {
        action: kind,
        reason: format!("autonomy_{}", action.as_snake()),
    }
}

/// Parse then map. Unknown names surface as [`NoemaError::UnmappedAutonomyAction`].
pub fn map_autonomy_action_name(name: &str) -> NoemaResult<ActionMapping> {
    name.parse::<AutonomyAction>()
        .map(map_autonomy_action_to_action_type)
}

/// Above this fear or frustration the agent only rests.
const EXHAUSTION_LEVEL: f64 = 0.8;

/// Pick an intention, weighted by the limbic state and active goals.
pub fn choose_autonomy_action(
    limbic: &LimbicState,
    goals: &GoalState,
    rng: &mut RandomSource,
) -> AutonomyAction {
    let l = limbic.clamped();
    if l.fear >= EXHAUSTION_LEVEL || l.frustration >= EXHAUSTION_LEVEL {
        return AutonomyAction::Rest;
    }

    let top_priority = goals
        .active
        .iter()
        .map(|g| g.priority.clamp(0.0, 1.0))
        .fold(0.0, f64::max);
    let has_goals = !goals.active.is_empty();

    let weights = [
        (AutonomyAction::ExploreWorld, l.curiosity),
        (AutonomyAction::Reflect, 0.1 + l.frustration * 0.5),
        (AutonomyAction::Rest, (l.fear + l.frustration) * 0.5),
        (
            AutonomyAction::Plan,
            if has_goals { 0.4 + top_priority * 0.3 } else { 0.05 },
        ),
        (AutonomyAction::Socialize, 0.05 + l.satisfaction * 0.4),
        (
            AutonomyAction::Research,
            l.curiosity * 0.5 + if has_goals { 0.3 } else { 0.0 },
        ),
    ];

    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    let mut roll = rng.next_f64() * total;
    for (action, weight) in weights {
        if roll < weight {
            return action;
        }
        roll -= weight;
    }
    AutonomyAction::Research
}
