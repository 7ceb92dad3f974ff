//! Infrastructure and service error model.

use thiserror::Error;

use farmlink_auth::AuthzError;
use farmlink_core::DomainError;

/// Storage-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),

    /// Duplicate insert or stale optimistic-concurrency version.
    #[error("repository conflict: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Error returned by every service operation.
///
/// All variants abort before the operation mutates anything, except where a service
/// documents a non-atomic window.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Authorization(#[from] AuthzError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Domain(DomainError::NotFound(_))
                | ServiceError::Repository(RepositoryError::NotFound(_))
        )
    }

    pub fn is_capacity(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::Capacity(_)))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ServiceError::Authorization(_) | ServiceError::Domain(DomainError::Unauthorized(_))
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Domain(DomainError::Conflict(_))
                | ServiceError::Repository(RepositoryError::Conflict(_))
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::Validation(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_wrapped_errors() {
        let e: ServiceError = DomainError::capacity("full").into();
        assert!(e.is_capacity());
        assert!(!e.is_not_found());

        let e: ServiceError = RepositoryError::NotFound("lot".into()).into();
        assert!(e.is_not_found());

        let e: ServiceError = RepositoryError::Conflict("stale".into()).into();
        assert!(e.is_conflict());
    }
}
