//! # Noema Limbic System (System 1)
//!
//! Fast, numeric, side-effect free regulation that runs every tick:
//!
//! - **Homeostasis**: emotional scalars relax toward fixed baselines
//! - **Executive gate**: candidates compete for working attention
//! - **Volition**: the final go/no-go before anything is emitted
//!
//! None of these components read global state. The kernel hands each call
//! the configuration snapshot it loaded at the start of the tick.

mod executive;
mod system;
mod volition;

pub use executive::{recency_factor, Candidate, CandidateMetadata, ExecutiveGate, ScoredCandidate};
pub use system::{ActionOutcome, LimbicSystem};
pub use volition::{ReasonCode, SpeechContext, VolitionDecision, VolitionSystem};
