//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant aborts the operation that raised it before any mutation is applied.
/// Soft conditions (capacity overage, ledger drift) are not errors; they travel as
/// warnings alongside successful results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (missing quantity, empty location, non-positive limits).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown warehouse, lot, order or delivery.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller may not act on the target (no manager link or location match).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient free space on add, or insufficient stock on warehouse dispatch.
    #[error("insufficient capacity: {0}")]
    Capacity(String),

    /// A domain invariant was violated (e.g. an illegal status transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A conflict occurred (stale version, duplicate receipt).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self::Capacity(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
