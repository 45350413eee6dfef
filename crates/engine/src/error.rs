use thiserror::Error;

use fairmarket_core::DomainError;
use fairmarket_store::StoreError;

/// Unified error surface of the engine.
///
/// Domain errors (validation, state machines) and store errors (optimistic
/// concurrency, availability) both funnel into this enum so callers handle
/// one taxonomy. A store-level version conflict surfaces as [`Conflict`]
/// once the bounded retries are exhausted.
///
/// [`Conflict`]: EngineError::Conflict
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A uniqueness or state precondition was violated; the caller may retry
    /// after resolving it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested transition is not legal from the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Not enough data to compute a result.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage backend failed outside the concurrency protocol.
    #[error("store error: {0}")]
    Store(StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            DomainError::InvalidState(msg) => EngineError::InvalidState(msg),
            DomainError::InsufficientData(msg) => EngineError::InsufficientData(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::NotFound => EngineError::NotFound("record not found".to_string()),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            StoreError::NotFound(msg) => EngineError::NotFound(msg),
            other @ StoreError::Unavailable(_) => EngineError::Store(other),
        }
    }
}
