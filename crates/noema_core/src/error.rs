use thiserror::Error;

/// Typed failures that must be distinguishable by callers.
///
/// Recoverable degradations (bad JSON, provider outage, invalid token
/// counts) are handled locally and never surface as one of these.
#[derive(Debug, Error)]
pub enum NoemaError {
    /// An autonomy intention with no action mapping. Never defaulted.
    #[error("unmapped autonomy action: {0}")]
    UnmappedAutonomyAction(String),

    #[error("{callsite} timed out after {timeout_ms}ms")]
    ProviderTimeout { callsite: String, timeout_ms: u64 },

    #[error("provider failure: {0}")]
    Provider(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

pub type NoemaResult<T> = Result<T, NoemaError>;
