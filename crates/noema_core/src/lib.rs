//! # Noema Core
//!
//! Shared vocabulary for the kernel: the turn-level state owned by the
//! reducer, live configuration, the error taxonomy, and the process-wide
//! services (token ledger, telemetry bus) that are constructed once at the
//! composition root and passed by reference to their consumers.

pub mod config;
pub mod error;
pub mod hashing;
pub mod ledger;
pub mod rng;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod trajectory;

pub use config::{
    EmbeddingsConfig, GateConfig, HomeostasisConfig, KernelConfig, LedgerConfig, NoemaConfig,
    SharedConfig, VolitionConfig,
};
pub use error::{NoemaError, NoemaResult};
pub use hashing::{content_hash, normalize_text, ContentHash};
pub use ledger::{LedgerSnapshot, TokenUsageEntry, TokenUsageInput, TokenUsageLedger, UsageTotals};
pub use rng::{create_rng, RandomSource};
pub use session::{LocalSession, SessionIds};
pub use state::{
    CandidateKind, Focus, Goal, GoalState, KernelState, LimbicState, Speaker, Turn,
};
pub use telemetry::{TelemetryBus, TelemetryEvent};
pub use trajectory::{apply_trajectory_update, AgentTrajectory, TrajectoryPatch};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One item returned by a semantic memory search, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    /// `None` when embeddings are unavailable; stores answer with no matches.
    pub embedding: Option<Vec<f32>>,
    pub limit: usize,
}

/// Text → vector. Implementations return `None` on any provider failure
/// instead of erroring past this boundary.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Option<Vec<f32>>;
}

/// Append-only conversation storage with semantic recall.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Ordered matches; empty (never an error) when no embedding is present.
    async fn semantic_search(&self, query: &SearchQuery) -> Vec<MemoryMatch>;

    async fn append_turn(&self, session_id: &str, hash: &ContentHash, turn: &Turn)
        -> anyhow::Result<()>;
}

/// Supplies the identity used to scope session ids and content hashes.
pub trait SessionProvider: Send + Sync {
    fn agent_id(&self) -> String;
    fn session_id(&self) -> String;
}
