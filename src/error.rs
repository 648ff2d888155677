//! Crate-wide error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScriptoriumError>;

/// Each variant maps to one user-visible HTTP status (see `api::AppError`)
/// and a distinct propagation policy.
#[derive(Debug, Error)]
pub enum ScriptoriumError {
    /// Caller input failed validation. Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Uniqueness or idempotency-token mismatch.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An internal invariant was violated. Fatal, never retried.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Storage I/O failure. Safe for the caller to retry.
    #[error("storage fault: {0}")]
    StorageFault(String),

    /// The indexer failed to commit a version. Retried by the visibility
    /// pipeline with bounded backoff.
    #[error("indexing failure: {0}")]
    IndexingFailure(String),

    /// An anchor could not be resolved against current content. Downgrades
    /// a single citation; never fails the whole request.
    #[error("anchor resolution failed: {0}")]
    AnchorResolutionFailed(String),

    /// Tokenization failed outright (e.g. chunker misconfiguration).
    /// Fatal for the request that triggered it.
    #[error("tokenization failed: {0}")]
    TokenizationFailed(String),

    /// Caller exceeded a rate limit; retry after the given delay.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Underlying I/O failure (snapshot persistence, log file writes).
    /// Safe for the caller to retry.
    #[error("io error: {0}")]
    Io(String),

    /// A value failed to serialize or deserialize across a boundary
    /// (wire payload, persisted snapshot). Never retried.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ScriptoriumError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ScriptoriumError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether the pipeline should retry the operation that produced this
    /// error. Only storage faults and indexing failures are retriable.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ScriptoriumError::StorageFault(_) | ScriptoriumError::IndexingFailure(_) | ScriptoriumError::Io(_)
        )
    }
}
