//! The only place `KernelState` changes.
//!
//! `reduce` is pure: it takes the previous state by value and returns the
//! next one. Conversation and thought buffers are bounded FIFOs.

use noema_core::state::clamp_unit;
use noema_core::{
    apply_trajectory_update, Focus, Goal, KernelConfig, KernelState, Speaker, TrajectoryPatch,
    Turn,
};
use noema_limbic::{ActionOutcome, LimbicSystem};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelEvent {
    /// One loop step: homeostasis plus the tick counter.
    Tick { now: i64 },
    UserInput { text: String, at: i64 },
    AgentSpoke { text: String, at: i64 },
    ThoughtRecorded { text: String },
    /// A self-initiated act. Counts as a speech act for refractory timing
    /// and is remembered as a thought.
    ActionTaken { description: String, at: i64 },
    ActionOutcome { outcome: ActionOutcome },
    TrajectoryPatched { patch: TrajectoryPatch, tick: u64, at: i64 },
    FocusChanged { focus: Option<Focus> },
    /// Replaces an active goal with the same id.
    GoalAdded { goal: Goal },
    GoalCompleted { id: String },
    SleepChanged { sleeping: bool },
    /// Additive, clamped to [0, 1].
    ResonanceShift { delta: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerLimits {
    pub conversation_limit: usize,
    pub thought_limit: usize,
}

impl Default for ReducerLimits {
    fn default() -> Self {
        Self::from(&KernelConfig::default())
    }
}

impl From<&KernelConfig> for ReducerLimits {
    fn from(cfg: &KernelConfig) -> Self {
        Self {
            conversation_limit: cfg.conversation_limit.max(1),
            thought_limit: cfg.thought_limit.max(1),
        }
    }
}

fn push_turn(state: &mut KernelState, turn: Turn, limit: usize) {
    state.conversation.push_back(turn);
    while state.conversation.len() > limit {
        state.conversation.pop_front();
    }
}

fn push_thought(state: &mut KernelState, thought: String, limit: usize) {
    state.thoughts.push_back(thought);
    while state.thoughts.len() > limit {
        state.thoughts.pop_front();
    }
}

pub fn reduce(
    mut state: KernelState,
    event: &KernelEvent,
    limits: &ReducerLimits,
    limbic: &LimbicSystem,
) -> KernelState {
    match event {
        KernelEvent::Tick { .. } => {
            state.tick += 1;
            state.limbic = limbic.apply_homeostasis(state.limbic);
        }
        KernelEvent::UserInput { text, at } => {
            push_turn(
                &mut state,
                Turn { speaker: Speaker::User, text: text.clone(), at: *at },
                limits.conversation_limit,
            );
            state.last_input_at = Some(*at);
        }
        KernelEvent::AgentSpoke { text, at } => {
            push_turn(
                &mut state,
                Turn { speaker: Speaker::Agent, text: text.clone(), at: *at },
                limits.conversation_limit,
            );
            state.last_speech_at = Some(*at);
        }
        KernelEvent::ThoughtRecorded { text } => {
            push_thought(&mut state, text.clone(), limits.thought_limit);
        }
        KernelEvent::ActionTaken { description, at } => {
            state.last_speech_at = Some(*at);
            push_thought(&mut state, description.clone(), limits.thought_limit);
        }
        KernelEvent::ActionOutcome { outcome } => {
            state.limbic = limbic.apply_action_outcome(state.limbic, *outcome);
        }
        KernelEvent::TrajectoryPatched { patch, tick, at } => {
            state.trajectory = Some(apply_trajectory_update(
                state.trajectory.as_ref(),
                patch,
                *tick,
                Some(*at),
            ));
        }
        KernelEvent::FocusChanged { focus } => {
            state.focus = focus.clone();
        }
        KernelEvent::GoalAdded { goal } => {
            match state.goals.active.iter_mut().find(|g| g.id == goal.id) {
                Some(existing) => *existing = goal.clone(),
                None => state.goals.active.push(goal.clone()),
            }
        }
        KernelEvent::GoalCompleted { id } => {
            let before = state.goals.active.len();
            state.goals.active.retain(|g| &g.id != id);
            if state.goals.active.len() < before {
                state.goals.completed.push(id.clone());
            }
        }
        KernelEvent::SleepChanged { sleeping } => {
            state.sleeping = *sleeping;
        }
        KernelEvent::ResonanceShift { delta } => {
            state.resonance = clamp_unit(state.resonance + delta, state.resonance);
        }
    }
    state
}
