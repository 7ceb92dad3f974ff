//! Whole-lot reservation against vendor orders.
//!
//! A touched lot is reserved in full even when only part of it is needed; the unneeded
//! remainder becomes available again only when the reservation is committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{DomainError, DomainResult, LotId};

use crate::{Committed, InventoryLot, fifo};

/// One reserved lot recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub lot_id: LotId,
    pub reserved_quantity: i64,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReservationPlan {
    pub reservations: Vec<Reservation>,
    pub covered: i64,
    /// Units no lot could cover. Partial coverage is allowed; the caller decides.
    pub uncovered: i64,
}

impl ReservationPlan {
    pub fn is_complete(&self) -> bool {
        self.uncovered == 0
    }
}

/// Reserve available lots oldest-first until `requested` is covered or lots run out.
pub fn reserve_lots(
    lots: &mut [InventoryLot],
    requested: i64,
    at: DateTime<Utc>,
) -> DomainResult<ReservationPlan> {
    if requested <= 0 {
        return Err(DomainError::validation("requested quantity must be positive"));
    }

    let order: Vec<LotId> = {
        let mut refs: Vec<&InventoryLot> = lots
            .iter()
            .filter(|l| l.is_available() && l.quantity() > 0)
            .collect();
        fifo::fifo_sort(&mut refs);
        refs.into_iter().map(InventoryLot::id_typed).collect()
    };

    let mut remaining = requested;
    let mut reservations = Vec::new();

    for lot_id in order {
        if remaining == 0 {
            break;
        }
        let Some(lot) = lots.iter_mut().find(|l| l.id_typed() == lot_id) else {
            continue;
        };
        lot.reserve(at)?;
        let reserved_quantity = remaining.min(lot.quantity());
        remaining -= reserved_quantity;
        reservations.push(Reservation {
            lot_id,
            reserved_quantity,
            reserved_at: at,
        });
    }

    Ok(ReservationPlan {
        reservations,
        covered: requested - remaining,
        uncovered: remaining,
    })
}

pub fn commit_reservation(
    lot: &mut InventoryLot,
    reservation: &Reservation,
    at: DateTime<Utc>,
) -> DomainResult<Committed> {
    if lot.id_typed() != reservation.lot_id {
        return Err(DomainError::invariant("reservation does not belong to this lot"));
    }
    lot.commit(reservation.reserved_quantity, at)
}

/// Returns false when the lot had already left the reserved state.
pub fn release_reservation(lot: &mut InventoryLot, at: DateTime<Utc>) -> bool {
    lot.release(at)
}
