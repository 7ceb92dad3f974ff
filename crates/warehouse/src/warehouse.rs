//! Warehouse records and the capacity ledger arithmetic.
//!
//! The cached `current_capacity` counter is advisory: adds past the limit and removes
//! below zero are clamped or flagged, never refused. `reconcile_capacity` snaps it back
//! to the sum of the lots stored at the location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{DomainError, DomainResult, Entity, GeoPoint, UserId};

/// Direction of a capacity ledger update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityOp {
    Add,
    Remove,
}

/// Non-fatal capacity inconsistency. Logged and returned, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    /// An add pushed the cached counter above the capacity limit.
    CapacityExceeded {
        location: String,
        capacity_limit: i64,
        current_capacity: i64,
    },
    /// The cached counter disagreed with the sum of lot quantities.
    LedgerDrift {
        location: String,
        cached: i64,
        recomputed: i64,
    },
}

impl core::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConsistencyWarning::CapacityExceeded {
                location,
                capacity_limit,
                current_capacity,
            } => write!(
                f,
                "warehouse '{location}' holds {current_capacity} units, above its limit of {capacity_limit}"
            ),
            ConsistencyWarning::LedgerDrift {
                location,
                cached,
                recomputed,
            } => write!(
                f,
                "warehouse '{location}' counter was {cached} but lots sum to {recomputed}"
            ),
        }
    }
}

/// Result of applying one capacity update to a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityChange {
    pub location: String,
    pub op: CapacityOp,
    pub quantity: i64,
    pub previous: i64,
    pub current: i64,
    pub warning: Option<ConsistencyWarning>,
}

/// Warehouse record, keyed by its unique location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    location: String,
    capacity_limit: i64,
    current_capacity: i64,
    manager: Option<UserId>,
    coordinates: Option<GeoPoint>,
    updated_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn new(location: impl Into<String>, capacity_limit: i64) -> DomainResult<Self> {
        let location = location.into();
        if location.trim().is_empty() {
            return Err(DomainError::validation("warehouse location cannot be empty"));
        }
        if capacity_limit <= 0 {
            return Err(DomainError::validation("capacity_limit must be positive"));
        }
        Ok(Self {
            location,
            capacity_limit,
            current_capacity: 0,
            manager: None,
            coordinates: None,
            updated_at: Utc::now(),
        })
    }

    pub fn with_manager(mut self, manager: UserId) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_coordinates(mut self, coordinates: GeoPoint) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Seed the cached counter when importing an existing warehouse.
    pub fn with_current_capacity(mut self, current_capacity: i64) -> Self {
        self.current_capacity = current_capacity.max(0);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn capacity_limit(&self) -> i64 {
        self.capacity_limit
    }

    pub fn current_capacity(&self) -> i64 {
        self.current_capacity
    }

    pub fn manager(&self) -> Option<UserId> {
        self.manager
    }

    pub fn coordinates(&self) -> Option<&GeoPoint> {
        self.coordinates.as_ref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a ledger update to the cached counter.
    ///
    /// Adds are permissive: exceeding `capacity_limit` yields a warning, not an error.
    /// Removes floor at zero. Only the capacity ledger service should call this.
    pub fn apply_capacity_change(
        &mut self,
        op: CapacityOp,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<CapacityChange> {
        if quantity < 0 {
            return Err(DomainError::validation("capacity quantity cannot be negative"));
        }

        let previous = self.current_capacity;
        self.current_capacity = match op {
            CapacityOp::Add => previous.saturating_add(quantity),
            CapacityOp::Remove => (previous - quantity).max(0),
        };
        self.updated_at = at;

        let warning = (op == CapacityOp::Add && self.current_capacity > self.capacity_limit).then(
            || ConsistencyWarning::CapacityExceeded {
                location: self.location.clone(),
                capacity_limit: self.capacity_limit,
                current_capacity: self.current_capacity,
            },
        );

        Ok(CapacityChange {
            location: self.location.clone(),
            op,
            quantity,
            previous,
            current: self.current_capacity,
            warning,
        })
    }

    /// Overwrite the cached counter with a recomputed lot sum.
    ///
    /// Returns the drift when the two disagreed.
    pub fn reconcile_capacity(
        &mut self,
        recomputed: i64,
        at: DateTime<Utc>,
    ) -> Option<ConsistencyWarning> {
        let cached = self.current_capacity;
        self.current_capacity = recomputed.max(0);
        self.updated_at = at;
        (cached != self.current_capacity).then(|| ConsistencyWarning::LedgerDrift {
            location: self.location.clone(),
            cached,
            recomputed: self.current_capacity,
        })
    }
}

impl Entity for Warehouse {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.location
    }
}
