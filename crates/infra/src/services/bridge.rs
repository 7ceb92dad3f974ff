//! Moves quantity between farmer, warehouse and vendor ownership at the delivery
//! receipt/dispatch boundary, keeping lots and the capacity ledger in lockstep.
//!
//! Every warehouse-side sequence runs under that warehouse's location lock. Checks
//! happen before the first write. Receipt, dispatch and farmer consumption each claim
//! a one-shot marker on the delivery with a version-checked save before moving any
//! stock, so a retried or concurrent call fails with a conflict instead of counting
//! twice. A failure after the claim is not rolled back (see DESIGN.md).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use farmlink_auth::{ManagerAccess, Principal, authorize_lot_management, explain_lot_management};
use farmlink_core::{DeliveryId, DomainError, ExpectedVersion, LotId, UserId};
use farmlink_inventory::{ConsumptionPlan, InventoryLot, LotMutation, plan_fifo};
use farmlink_orders::Delivery;
use farmlink_warehouse::{Candidate, CapacityChange, CapacityOp, ScoringPolicy, Warehouse};

use crate::alerts::{AlertSink, Alerting};
use crate::error::ServiceResult;
use crate::locks::LocationLocks;
use crate::repository::{
    DeliveryRepository, LotRepository, Stores, UserDirectory, WarehouseRepository,
};
use crate::services::{
    CapacityLedger, OwnerResolver, ResolvedOwner, UtilizationTracker, WarehouseSelector,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiveOutcome {
    pub lot: InventoryLot,
    pub owner: ResolvedOwner,
    pub capacity: CapacityChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimalReceipt {
    pub candidate: Candidate,
    pub receipt: ReceiveOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub plan: ConsumptionPlan,
    pub capacity: CapacityChange,
    pub vendor_lot: InventoryLot,
}

/// Best-effort result of draining a farmer's own lots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmerConsumption {
    pub requested: i64,
    pub consumed: i64,
    pub touched: Vec<LotId>,
    /// Set when the farmer's lots could not cover the delivery.
    pub warning: Option<String>,
}

impl FarmerConsumption {
    pub fn shortfall(&self) -> i64 {
        self.requested - self.consumed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOp {
    Add,
    Remove,
    Adjust,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualAdjustment {
    pub lot_id: LotId,
    pub op: ManualOp,
    pub previous: i64,
    pub current: i64,
    pub deleted: bool,
    pub access: ManagerAccess,
    /// `None` when the lot is not at a registered warehouse.
    pub capacity: Option<CapacityChange>,
}

pub struct DeliveryInventoryBridge<W, L, D, U, A> {
    warehouses: W,
    lots: L,
    deliveries: D,
    owners: OwnerResolver<W, U>,
    tracker: UtilizationTracker<W, L>,
    selector: WarehouseSelector<W, L>,
    ledger: CapacityLedger<W, L, A>,
    alerting: Alerting<A>,
    locks: Arc<LocationLocks>,
}

impl<W, L, D, U, A> DeliveryInventoryBridge<W, L, D, U, A>
where
    W: WarehouseRepository + Clone,
    L: LotRepository + Clone,
    D: DeliveryRepository + Clone,
    U: UserDirectory + Clone,
    A: AlertSink + Clone,
{
    pub fn new<O>(
        stores: &Stores<W, L, O, D, U>,
        policy: ScoringPolicy,
        alerting: Alerting<A>,
        locks: Arc<LocationLocks>,
    ) -> Self {
        let tracker = UtilizationTracker::new(stores.warehouses.clone(), stores.lots.clone());
        Self {
            warehouses: stores.warehouses.clone(),
            lots: stores.lots.clone(),
            deliveries: stores.deliveries.clone(),
            owners: OwnerResolver::new(stores.warehouses.clone(), stores.users.clone()),
            selector: WarehouseSelector::new(tracker.clone(), policy),
            tracker,
            ledger: CapacityLedger::new(
                stores.warehouses.clone(),
                stores.lots.clone(),
                locks.clone(),
                alerting.clone(),
            ),
            alerting,
            locks,
        }
    }

    fn load_delivery(&self, id: DeliveryId) -> ServiceResult<Delivery> {
        Ok(self
            .deliveries
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("delivery {id}")))?)
    }

    fn load_warehouse(&self, location: &str) -> ServiceResult<Warehouse> {
        Ok(self
            .warehouses
            .get(location)?
            .ok_or_else(|| DomainError::not_found(format!("warehouse '{location}'")))?)
    }

    fn load_unreceived(&self, id: DeliveryId) -> ServiceResult<Delivery> {
        let delivery = self.load_delivery(id)?;
        if delivery.received_by_warehouse() {
            return Err(DomainError::conflict(format!(
                "delivery {id} was already received into a warehouse"
            ))
            .into());
        }
        Ok(delivery)
    }

    /// Caller must hold the lock for `warehouse`. The delivery is re-read here; the
    /// receipt marker is saved before the lot and ledger writes.
    fn receive_locked(
        &self,
        delivery_id: DeliveryId,
        warehouse: &Warehouse,
        received_by: UserId,
    ) -> ServiceResult<ReceiveOutcome> {
        let mut delivery = self.load_unreceived(delivery_id)?;
        let expected = ExpectedVersion::Exact(delivery.version());
        let now = Utc::now();
        let location = warehouse.location();
        let owner = self.owners.resolve(location, delivery.transporter())?;

        let mut lot = InventoryLot::new(
            owner.owner,
            delivery.goods_description(),
            delivery.quantity(),
            delivery.unit(),
            location,
            now,
        )?
        .with_source_delivery(delivery.id_typed());
        lot.append_note(
            Some(received_by),
            format!("received from delivery {}", delivery.id_typed()),
            now,
        );

        delivery.mark_received_by_warehouse(now)?;
        self.deliveries.save(delivery.clone(), expected)?;
        self.lots.insert(lot.clone())?;
        let capacity = self
            .ledger
            .update_capacity_locked(location, delivery.quantity(), CapacityOp::Add)?;

        info!(
            delivery_id = %delivery.id_typed(),
            lot_id = %lot.id_typed(),
            location,
            quantity = delivery.quantity(),
            owner_source = ?owner.source,
            "delivery received into warehouse"
        );
        Ok(ReceiveOutcome {
            lot,
            owner,
            capacity,
        })
    }

    /// Stock a delivery into the warehouse at `location`.
    ///
    /// Capacity is not checked here: the ledger accepts the add and reports any
    /// overage as a warning.
    #[instrument(skip(self))]
    pub fn receive_into_warehouse(
        &self,
        delivery_id: DeliveryId,
        location: &str,
        received_by: UserId,
    ) -> ServiceResult<ReceiveOutcome> {
        if location.trim().is_empty() {
            return Err(DomainError::validation("warehouse location cannot be empty").into());
        }
        self.load_unreceived(delivery_id)?;

        self.locks.with_location(location, || {
            let warehouse = self.load_warehouse(location)?;
            self.receive_locked(delivery_id, &warehouse, received_by)
        })
    }

    /// Select the best warehouse for a delivery and stock it there in one step.
    ///
    /// Free space is re-checked under the chosen warehouse's lock; a candidate that
    /// filled up in the meantime is skipped in favour of the next one.
    #[instrument(skip(self))]
    pub fn receive_into_optimal_warehouse(
        &self,
        delivery_id: DeliveryId,
        received_by: UserId,
        preferred_location: Option<&str>,
    ) -> ServiceResult<OptimalReceipt> {
        let delivery = self.load_unreceived(delivery_id)?;
        let quantity = delivery.quantity();
        let origin = delivery.pickup().coordinates;

        let ranked = self
            .selector
            .rank(origin.as_ref(), quantity, preferred_location)?;

        for candidate in ranked {
            let location = candidate.location().to_string();
            let receipt = self.locks.with_location(&location, || -> ServiceResult<Option<ReceiveOutcome>> {
                let warehouse = self.load_warehouse(&location)?;
                let utilization = self.tracker.utilization_of(&warehouse)?;
                if !utilization.can_accept(quantity) {
                    return Ok(None);
                }
                self.receive_locked(delivery_id, &warehouse, received_by)
                    .map(Some)
            })?;

            match receipt {
                Some(receipt) => return Ok(OptimalReceipt { candidate, receipt }),
                None => debug!(location = %location, "candidate filled up before receipt, trying next"),
            }
        }

        Err(DomainError::capacity(format!("no warehouse can accept {quantity} units")).into())
    }

    /// Apply a FIFO plan to the lots it was computed from.
    fn apply_plan(
        &self,
        plan: &ConsumptionPlan,
        source: &[InventoryLot],
        author: UserId,
        note: &str,
        at: DateTime<Utc>,
    ) -> ServiceResult<()> {
        for step in &plan.steps {
            match step.mutation {
                LotMutation::Delete => {
                    self.lots.remove(step.lot_id)?;
                }
                LotMutation::Decrement { .. } => {
                    let Some(lot) = source.iter().find(|l| l.id_typed() == step.lot_id) else {
                        continue;
                    };
                    let mut lot = lot.clone();
                    let before = lot.quantity();
                    lot.take(step.take, at)?;
                    lot.append_note(Some(author), format!("{note}: -{}", step.take), at);
                    self.lots.update(lot.clone())?;
                    self.alerting.lot_quantity_changed(&lot, before);
                }
            }
        }
        Ok(())
    }

    /// Ship a delivery's goods out of the warehouse at `location` to its vendor.
    ///
    /// Hard-fails, before touching any lot, when available stock cannot cover the
    /// whole delivery. No partial dispatch from a warehouse. A delivery is dispatched
    /// at most once; a repeat is a conflict.
    #[instrument(skip(self))]
    pub fn dispatch_from_warehouse(
        &self,
        delivery_id: DeliveryId,
        location: &str,
        dispatched_by: UserId,
    ) -> ServiceResult<DispatchOutcome> {
        let delivery = self.load_delivery(delivery_id)?;
        let vendor = delivery
            .vendor()
            .ok_or_else(|| DomainError::validation(format!("delivery {delivery_id} has no vendor")))?;
        let item = delivery.goods_description().to_string();
        let quantity = delivery.quantity();
        let now = Utc::now();

        // Built first so a bad dropoff fails before stock moves.
        let mut vendor_lot = InventoryLot::new(
            vendor,
            item.as_str(),
            quantity,
            delivery.unit(),
            delivery.dropoff().address.as_str(),
            now,
        )?
        .with_source_delivery(delivery_id);
        vendor_lot.append_note(
            Some(dispatched_by),
            format!("dispatched from '{location}' via delivery {delivery_id}"),
            now,
        );

        let (plan, capacity) = self.locks.with_location(location, || -> ServiceResult<_> {
            self.load_warehouse(location)?;
            let mut delivery = self.load_delivery(delivery_id)?;
            let expected = ExpectedVersion::Exact(delivery.version());
            delivery.mark_dispatched_from_warehouse(now)?;

            let source: Vec<InventoryLot> = self
                .lots
                .list_at(location)?
                .into_iter()
                .filter(|l| l.matches_item(&item))
                .collect();

            let plan = plan_fifo(source.iter(), quantity);
            if !plan.is_complete() {
                return Err(DomainError::capacity(format!(
                    "only {} of {quantity} '{item}' available at '{location}'",
                    plan.covered
                ))
                .into());
            }

            self.deliveries.save(delivery, expected)?;
            self.apply_plan(&plan, &source, dispatched_by, "dispatched", now)?;
            let capacity = self
                .ledger
                .update_capacity_locked(location, plan.covered, CapacityOp::Remove)?;
            Ok((plan, capacity))
        })?;

        self.lots.insert(vendor_lot.clone())?;

        info!(
            delivery_id = %delivery_id,
            location,
            quantity,
            lots = plan.steps.len(),
            "goods dispatched from warehouse"
        );
        Ok(DispatchOutcome {
            plan,
            capacity,
            vendor_lot,
        })
    }

    /// Drain a farmer's own lots for a delivery they handed over.
    ///
    /// Farmer-side bookkeeping is best-effort: a shortfall is returned as a warning,
    /// never raised. The delivery is marked before any lot is drained, so a second call
    /// for the same delivery is a conflict.
    #[instrument(skip(self))]
    pub fn consume_from_farmer(
        &self,
        delivery_id: DeliveryId,
        delivered_by: UserId,
    ) -> ServiceResult<FarmerConsumption> {
        let mut delivery = self.load_delivery(delivery_id)?;
        let farmer = delivery
            .farmer()
            .ok_or_else(|| DomainError::validation(format!("delivery {delivery_id} has no farmer")))?;
        let expected = ExpectedVersion::Exact(delivery.version());
        delivery.mark_farmer_stock_consumed(Utc::now())?;
        self.deliveries.save(delivery.clone(), expected)?;
        let item = delivery.goods_description();
        let requested = delivery.quantity();

        let owned: Vec<InventoryLot> = self
            .lots
            .list_owned_by(farmer)?
            .into_iter()
            .filter(|l| l.matches_item(item))
            .collect();
        let plan = plan_fifo(owned.iter(), requested);

        let mut consumed = 0;
        let mut touched = Vec::new();
        for step in &plan.steps {
            let Some(planned) = owned.iter().find(|l| l.id_typed() == step.lot_id) else {
                continue;
            };
            // Re-read under the lot's own location lock; it may have moved since planning.
            let taken = self.locks.with_location(planned.location(), || -> ServiceResult<i64> {
                let Some(mut lot) = self.lots.get(step.lot_id)? else {
                    return Ok(0);
                };
                if !lot.is_available() {
                    return Ok(0);
                }
                let now = Utc::now();
                let take = step.take.min(lot.quantity());
                if take == lot.quantity() {
                    self.lots.remove(step.lot_id)?;
                } else if take > 0 {
                    let before = lot.quantity();
                    lot.take(take, now)?;
                    lot.append_note(
                        Some(delivered_by),
                        format!("handed over on delivery {delivery_id}: -{take}"),
                        now,
                    );
                    self.lots.update(lot.clone())?;
                    self.alerting.lot_quantity_changed(&lot, before);
                }
                Ok(take)
            })?;

            if taken > 0 {
                consumed += taken;
                touched.push(step.lot_id);
            }
        }

        let shortfall = requested - consumed;
        let warning = (shortfall > 0).then(|| {
            format!("farmer {farmer} held only {consumed} of {requested} '{item}'")
        });
        match &warning {
            Some(w) => warn!(delivery_id = %delivery_id, shortfall, "{w}"),
            None => info!(delivery_id = %delivery_id, consumed, "farmer stock consumed"),
        }

        Ok(FarmerConsumption {
            requested,
            consumed,
            touched,
            warning,
        })
    }

    /// Lock the lot's location, re-read the lot and authorize `manager` against it.
    fn with_managed_lot<T>(
        &self,
        lot_id: LotId,
        manager: &Principal,
        reason: &str,
        f: impl FnOnce(InventoryLot, Option<Warehouse>, ManagerAccess) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        if reason.trim().is_empty() {
            return Err(DomainError::validation("a reason is required for manual adjustments").into());
        }
        let location = self
            .lots
            .get(lot_id)?
            .ok_or_else(|| DomainError::not_found(format!("lot {lot_id}")))?
            .location()
            .to_string();

        self.locks.with_location(&location, || {
            let lot = self
                .lots
                .get(lot_id)?
                .ok_or_else(|| DomainError::not_found(format!("lot {lot_id}")))?;
            let warehouse = self.warehouses.get(&location)?;
            let linked = warehouse.as_ref().and_then(Warehouse::manager);
            let access = authorize_lot_management(manager, &location, linked).inspect_err(|_| {
                let audit = explain_lot_management(manager, &location, linked);
                warn!(lot_id = %lot_id, reason = %audit.reason, "manual adjustment denied");
            })?;
            if !lot.is_available() {
                return Err(DomainError::invariant(format!(
                    "lot {lot_id} is {:?}; only available lots can be adjusted",
                    lot.status()
                ))
                .into());
            }
            f(lot, warehouse, access)
        })
    }

    /// Reject an increase the warehouse has no room for. Lots outside a registered
    /// warehouse are uncapacitated.
    fn ensure_room(&self, warehouse: Option<&Warehouse>, amount: i64) -> ServiceResult<()> {
        let Some(warehouse) = warehouse else {
            return Ok(());
        };
        let utilization = self.tracker.utilization_of(warehouse)?;
        if !utilization.can_accept(amount) {
            return Err(DomainError::capacity(format!(
                "warehouse '{}' has {} free, cannot add {amount}",
                warehouse.location(),
                utilization.free_space
            ))
            .into());
        }
        Ok(())
    }

    fn ledger_for(
        &self,
        warehouse: Option<&Warehouse>,
        amount: i64,
        op: CapacityOp,
    ) -> ServiceResult<Option<CapacityChange>> {
        match warehouse {
            Some(w) if amount > 0 => Ok(Some(self.ledger.update_capacity_locked(
                w.location(),
                amount,
                op,
            )?)),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self, manager), fields(manager = %manager.user_id))]
    pub fn manual_add(
        &self,
        lot_id: LotId,
        manager: &Principal,
        reason: &str,
        amount: i64,
    ) -> ServiceResult<ManualAdjustment> {
        if amount <= 0 {
            return Err(DomainError::validation("amount must be positive").into());
        }
        self.with_managed_lot(lot_id, manager, reason, |mut lot, warehouse, access| {
            self.ensure_room(warehouse.as_ref(), amount)?;

            let now = Utc::now();
            let previous = lot.quantity();
            lot.add(amount, now)?;
            lot.append_note(Some(manager.user_id), format!("{reason} (+{amount})"), now);
            self.lots.update(lot.clone())?;
            let capacity = self.ledger_for(warehouse.as_ref(), amount, CapacityOp::Add)?;

            info!(lot_id = %lot_id, previous, current = lot.quantity(), "manual stock add");
            Ok(ManualAdjustment {
                lot_id,
                op: ManualOp::Add,
                previous,
                current: lot.quantity(),
                deleted: false,
                access,
                capacity,
            })
        })
    }

    /// Remove `amount` units, or the whole lot when `amount` is `None` or at least the
    /// lot's quantity. Never drives a lot below zero.
    #[instrument(skip(self, manager), fields(manager = %manager.user_id))]
    pub fn manual_remove(
        &self,
        lot_id: LotId,
        manager: &Principal,
        reason: &str,
        amount: Option<i64>,
    ) -> ServiceResult<ManualAdjustment> {
        if matches!(amount, Some(a) if a <= 0) {
            return Err(DomainError::validation("amount must be positive").into());
        }
        self.with_managed_lot(lot_id, manager, reason, |mut lot, warehouse, access| {
            let now = Utc::now();
            let previous = lot.quantity();
            let delete = amount.is_none_or(|a| a >= previous);

            let removed = if delete {
                self.lots.remove(lot_id)?;
                previous
            } else {
                let taken = lot.take(amount.unwrap_or(0), now)?;
                lot.append_note(Some(manager.user_id), format!("{reason} (-{taken})"), now);
                self.lots.update(lot.clone())?;
                self.alerting.lot_quantity_changed(&lot, previous);
                taken
            };
            let capacity = self.ledger_for(warehouse.as_ref(), removed, CapacityOp::Remove)?;

            info!(lot_id = %lot_id, previous, removed, deleted = delete, "manual stock removal");
            Ok(ManualAdjustment {
                lot_id,
                op: ManualOp::Remove,
                previous,
                current: previous - removed,
                deleted: delete,
                access,
                capacity,
            })
        })
    }

    /// Set a lot to `new_quantity`. Zero deletes the lot.
    #[instrument(skip(self, manager), fields(manager = %manager.user_id))]
    pub fn manual_adjust(
        &self,
        lot_id: LotId,
        manager: &Principal,
        reason: &str,
        new_quantity: i64,
    ) -> ServiceResult<ManualAdjustment> {
        if new_quantity < 0 {
            return Err(DomainError::validation("lot quantity cannot be negative").into());
        }
        self.with_managed_lot(lot_id, manager, reason, |mut lot, warehouse, access| {
            let now = Utc::now();
            let previous = lot.quantity();
            let delta = new_quantity - previous;
            if delta > 0 {
                self.ensure_room(warehouse.as_ref(), delta)?;
            }

            let deleted = new_quantity == 0;
            if deleted {
                self.lots.remove(lot_id)?;
            } else {
                lot.set_quantity(new_quantity, now)?;
                lot.append_note(
                    Some(manager.user_id),
                    format!("{reason} ({previous} -> {new_quantity})"),
                    now,
                );
                self.lots.update(lot.clone())?;
                self.alerting.lot_quantity_changed(&lot, previous);
            }

            let capacity = if delta >= 0 {
                self.ledger_for(warehouse.as_ref(), delta, CapacityOp::Add)?
            } else {
                self.ledger_for(warehouse.as_ref(), -delta, CapacityOp::Remove)?
            };

            info!(lot_id = %lot_id, previous, current = new_quantity, "manual stock adjustment");
            Ok(ManualAdjustment {
                lot_id,
                op: ManualOp::Adjust,
                previous,
                current: new_quantity,
                deleted,
                access,
                capacity,
            })
        })
    }
}
