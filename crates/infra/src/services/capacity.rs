use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use farmlink_core::DomainError;
use farmlink_warehouse::{CapacityChange, CapacityOp, ConsistencyWarning, Utilization};

use crate::alerts::{AlertSink, Alerting};
use crate::error::ServiceResult;
use crate::locks::LocationLocks;
use crate::repository::{LotRepository, WarehouseRepository};

/// The per-warehouse running usage counter.
///
/// The only way the cached `current_capacity` is written. Adds past the limit are
/// permitted and reported as a `ConsistencyWarning`; removals floor at zero.
#[derive(Debug, Clone)]
pub struct CapacityLedger<W, L, A> {
    warehouses: W,
    lots: L,
    locks: Arc<LocationLocks>,
    alerting: Alerting<A>,
}

impl<W, L, A> CapacityLedger<W, L, A>
where
    W: WarehouseRepository,
    L: LotRepository,
    A: AlertSink,
{
    pub fn new(warehouses: W, lots: L, locks: Arc<LocationLocks>, alerting: Alerting<A>) -> Self {
        Self {
            warehouses,
            lots,
            locks,
            alerting,
        }
    }

    #[instrument(skip(self))]
    pub fn update_capacity(
        &self,
        location: &str,
        quantity: i64,
        op: CapacityOp,
    ) -> ServiceResult<CapacityChange> {
        self.locks
            .with_location(location, || self.update_capacity_locked(location, quantity, op))
    }

    /// Caller must hold the location lock.
    pub(crate) fn update_capacity_locked(
        &self,
        location: &str,
        quantity: i64,
        op: CapacityOp,
    ) -> ServiceResult<CapacityChange> {
        let mut warehouse = self
            .warehouses
            .get(location)?
            .ok_or_else(|| DomainError::not_found(format!("warehouse '{location}'")))?;

        let before = Utilization::compute(location, warehouse.capacity_limit(), warehouse.current_capacity());
        let change = warehouse.apply_capacity_change(op, quantity, Utc::now())?;
        let after = Utilization::compute(location, warehouse.capacity_limit(), warehouse.current_capacity());
        self.warehouses.upsert(warehouse)?;

        if let Some(warning) = &change.warning {
            warn!(%warning, "capacity limit exceeded");
        }
        info!(
            ?op,
            quantity,
            previous = change.previous,
            current = change.current,
            "capacity updated"
        );
        self.alerting.utilization_changed(&before, &after);

        Ok(change)
    }

    /// Overwrite the cached counter with the lot sum. Returns the drift, if any.
    #[instrument(skip(self))]
    pub fn reconcile(&self, location: &str) -> ServiceResult<Option<ConsistencyWarning>> {
        self.locks.with_location(location, || {
            let mut warehouse = self
                .warehouses
                .get(location)?
                .ok_or_else(|| DomainError::not_found(format!("warehouse '{location}'")))?;

            let recomputed = self.lots.sum_at(location)?;
            let drift = warehouse.reconcile_capacity(recomputed, Utc::now());
            self.warehouses.upsert(warehouse)?;

            match &drift {
                Some(warning) => warn!(%warning, "capacity ledger drift corrected"),
                None => info!(current = recomputed, "capacity ledger consistent"),
            }
            Ok(drift)
        })
    }
}
