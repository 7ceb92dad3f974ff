use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use farmlink_core::{DomainError, LotId};
use farmlink_inventory::{
    InventoryLot, LotStatus, Reservation, ReservationPlan, commit_reservation, release_reservation,
    reserve_lots,
};

use crate::alerts::{AlertSink, Alerting};
use crate::error::ServiceResult;
use crate::locks::LocationLocks;
use crate::repository::LotRepository;

/// Lots touched by a commit, with the quantity taken from each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub removed: i64,
    pub lots: Vec<(LotId, LotStatus, i64)>,
}

/// Reserves, commits and releases lots on behalf of vendor orders.
#[derive(Debug, Clone)]
pub struct ReservationManager<L, A> {
    lots: L,
    locks: Arc<LocationLocks>,
    alerting: Alerting<A>,
}

impl<L, A> ReservationManager<L, A>
where
    L: LotRepository,
    A: AlertSink,
{
    pub fn new(lots: L, locks: Arc<LocationLocks>, alerting: Alerting<A>) -> Self {
        Self {
            lots,
            locks,
            alerting,
        }
    }

    /// Reserve matching available lots at `location`, oldest first, whole lots at a time.
    ///
    /// Partial coverage is not an error; check `ReservationPlan::uncovered`.
    #[instrument(skip(self))]
    pub fn reserve(
        &self,
        location: &str,
        item_name: &str,
        requested: i64,
    ) -> ServiceResult<ReservationPlan> {
        self.locks.with_location(location, || {
            let mut candidates: Vec<InventoryLot> = self
                .lots
                .list_at(location)?
                .into_iter()
                .filter(|l| l.matches_item(item_name))
                .collect();

            let plan = reserve_lots(&mut candidates, requested, Utc::now())?;
            for r in &plan.reservations {
                if let Some(lot) = candidates.iter().find(|l| l.id_typed() == r.lot_id) {
                    self.lots.update(lot.clone())?;
                }
            }

            if plan.is_complete() {
                info!(lots = plan.reservations.len(), covered = plan.covered, "lots reserved");
            } else {
                warn!(
                    lots = plan.reservations.len(),
                    covered = plan.covered,
                    uncovered = plan.uncovered,
                    "reservation only partially covered"
                );
            }
            Ok(plan)
        })
    }

    /// Deduct every reservation from its lot. Caller must hold the location lock.
    ///
    /// All lots are checked before any is mutated: a missing or unreserved lot aborts
    /// the whole commit.
    pub(crate) fn commit_locked(
        &self,
        reservations: &[Reservation],
        at: DateTime<Utc>,
    ) -> ServiceResult<CommitOutcome> {
        let mut lots = Vec::with_capacity(reservations.len());
        for r in reservations {
            let lot = self
                .lots
                .get(r.lot_id)?
                .ok_or_else(|| DomainError::not_found(format!("reserved lot {}", r.lot_id)))?;
            if lot.status() != LotStatus::Reserved {
                return Err(DomainError::invariant(format!(
                    "lot {} is {:?}, expected reserved",
                    r.lot_id,
                    lot.status()
                ))
                .into());
            }
            lots.push(lot);
        }

        let mut outcome = CommitOutcome {
            removed: 0,
            lots: Vec::with_capacity(lots.len()),
        };
        for (mut lot, r) in lots.into_iter().zip(reservations) {
            let before = lot.quantity();
            let committed = commit_reservation(&mut lot, r, at)?;
            self.lots.update(lot.clone())?;
            self.alerting.lot_quantity_changed(&lot, before);

            outcome.removed += committed.removed;
            outcome
                .lots
                .push((lot.id_typed(), committed.status, committed.remaining));
        }
        Ok(outcome)
    }

    pub fn commit(&self, location: &str, reservations: &[Reservation]) -> ServiceResult<CommitOutcome> {
        self.locks
            .with_location(location, || self.commit_locked(reservations, Utc::now()))
    }

    /// Revert still-reserved lots to available. Lots that were already released, sold
    /// or removed are skipped, so repeating a release is a no-op.
    #[instrument(skip(self, reservations), fields(reservations = reservations.len()))]
    pub fn release(&self, location: &str, reservations: &[Reservation]) -> ServiceResult<usize> {
        self.locks
            .with_location(location, || self.release_locked(reservations, Utc::now()))
    }

    /// Caller must hold the location lock.
    pub(crate) fn release_locked(
        &self,
        reservations: &[Reservation],
        at: DateTime<Utc>,
    ) -> ServiceResult<usize> {
        let mut released = 0;
        for r in reservations {
            let Some(mut lot) = self.lots.get(r.lot_id)? else {
                debug!(lot_id = %r.lot_id, "reserved lot no longer exists");
                continue;
            };
            if release_reservation(&mut lot, at) {
                self.lots.update(lot)?;
                released += 1;
            }
        }
        info!(released, "reservations released");
        Ok(released)
    }
}
