use serde::Serialize;
use thiserror::Error;

use farmlink_core::{DomainError, UserId};

use crate::{Principal, Role};

/// How a manager was granted access to a warehouse location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerAccess {
    /// The warehouse record names this principal as its manager.
    ExplicitLink,
    /// The principal's own location equals the target location.
    LocationMatch,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{0}' may not manage warehouse stock")]
    RoleNotPermitted(Role),

    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::unauthorized(value.to_string())
    }
}

/// Decide whether `principal` may adjust stock at `target_location`.
///
/// Only warehouse managers qualify. Access is granted through an explicit
/// warehouse→manager link first, then through a location match.
///
/// - No IO
/// - No panics
pub fn authorize_lot_management(
    principal: &Principal,
    target_location: &str,
    linked_manager: Option<UserId>,
) -> Result<ManagerAccess, AuthzError> {
    if principal.role != Role::WarehouseManager {
        return Err(AuthzError::RoleNotPermitted(principal.role));
    }

    if linked_manager == Some(principal.user_id) {
        return Ok(ManagerAccess::ExplicitLink);
    }

    if principal.location.as_deref() == Some(target_location) {
        return Ok(ManagerAccess::LocationMatch);
    }

    Err(AuthzError::Forbidden(format!(
        "manager {} is neither linked to nor located at '{}'",
        principal.user_id, target_location
    )))
}

/// Auditable account of a lot-management authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub target_location: String,
    pub granted: bool,
    pub access: Option<ManagerAccess>,
    pub reason: String,
}

/// Same decision as [`authorize_lot_management`], rendered for audit trails.
pub fn explain_lot_management(
    principal: &Principal,
    target_location: &str,
    linked_manager: Option<UserId>,
) -> AuthorizationExplanation {
    match authorize_lot_management(principal, target_location, linked_manager) {
        Ok(access) => {
            let reason = match access {
                ManagerAccess::ExplicitLink => {
                    format!("warehouse '{target_location}' is linked to manager {}", principal.user_id)
                }
                ManagerAccess::LocationMatch => {
                    format!("manager {} is located at '{target_location}'", principal.user_id)
                }
            };
            AuthorizationExplanation {
                target_location: target_location.to_string(),
                granted: true,
                access: Some(access),
                reason,
            }
        }
        Err(err) => AuthorizationExplanation {
            target_location: target_location.to_string(),
            granted: false,
            access: None,
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Principal {
        Principal::new(UserId::new(), Role::WarehouseManager)
    }

    #[test]
    fn explicit_link_grants_access_regardless_of_location() {
        let m = manager().with_location("Nakuru Depot");
        let access = authorize_lot_management(&m, "Eldoret Silo", Some(m.user_id)).unwrap();
        assert_eq!(access, ManagerAccess::ExplicitLink);
    }

    #[test]
    fn location_match_grants_access_without_link() {
        let m = manager().with_location("Eldoret Silo");
        let access = authorize_lot_management(&m, "Eldoret Silo", None).unwrap();
        assert_eq!(access, ManagerAccess::LocationMatch);
    }

    #[test]
    fn unrelated_manager_is_forbidden() {
        let m = manager().with_location("Nakuru Depot");
        let err = authorize_lot_management(&m, "Eldoret Silo", Some(UserId::new())).unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden(_)));
    }

    #[test]
    fn non_managers_are_rejected_even_with_matching_location() {
        let farmer = Principal::new(UserId::new(), Role::Farmer).with_location("Eldoret Silo");
        let err = authorize_lot_management(&farmer, "Eldoret Silo", None).unwrap_err();
        assert_eq!(err, AuthzError::RoleNotPermitted(Role::Farmer));
    }

    #[test]
    fn authz_errors_become_unauthorized_domain_errors() {
        let err: DomainError = AuthzError::Forbidden("nope".into()).into();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[test]
    fn explanation_reports_denials() {
        let m = manager();
        let explanation = explain_lot_management(&m, "Eldoret Silo", None);
        assert!(!explanation.granted);
        assert!(explanation.access.is_none());
        assert!(explanation.reason.contains("Eldoret Silo"));
    }
}
