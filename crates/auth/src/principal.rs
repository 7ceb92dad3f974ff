use serde::{Deserialize, Serialize};

use farmlink_core::UserId;

use crate::Role;

/// A resolved caller: who they are, what role they hold and, for managers and
/// vendors, the location they are attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
    pub location: Option<String>,
}

impl Principal {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_warehouse_manager(&self) -> bool {
        self.role == Role::WarehouseManager
    }
}
