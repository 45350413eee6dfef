//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// state preconditions, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input). Rejected before any
    /// mutation takes place.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation violates a uniqueness or state precondition (e.g. a
    /// duplicate pending submission). The caller may retry once the conflict
    /// is resolved.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested transition is not legal from the current state. Not
    /// retryable without an external state change.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Not enough data to compute a result (e.g. too few category listings to
    /// derive a reference price). Non-fatal; callers degrade rather than fail.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
