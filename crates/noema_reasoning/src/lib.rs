//! # Noema Reasoning
//!
//! Turns raw input lines into at most one externally visible act per tick:
//! salience gating, intent detection, clarification decisions, autonomy
//! mapping, provider output extraction, and the kernel loop that drives
//! them through the reducer.

pub mod autonomy;
pub mod decision;
pub mod embedding;
pub mod extraction;
pub mod fuzzy;
pub mod intent;
pub mod kernel;
pub mod llm;
pub mod providers;
pub mod reducer;
pub mod thalamus;

pub use autonomy::{
    choose_autonomy_action, map_autonomy_action_name, map_autonomy_action_to_action_type,
    ActionMapping, ActionType, AutonomyAction,
};
pub use decision::{input_contains_explicit_id, should_ask_user, DecisionEngine, IdRule};
pub use embedding::EmbeddingGuard;
pub use extraction::{
    extract_text, extract_usage, first_non_empty, parse_json_lenient, parse_json_or_default,
    Strategy,
};
pub use fuzzy::{classify_intent_fuzzy, levenshtein};
pub use intent::{Intent, IntentDetector};
pub use kernel::{KernelDeps, KernelOutput, KernelRunner};
pub use llm::{CompletionParams, ReplyRequest, Responder};
pub use reducer::{reduce, KernelEvent, ReducerLimits};
pub use thalamus::{ThalamicDecision, ThalamicFilter};
