//! Vendor order workflow: placement with warehouse selection and reservation,
//! approval, rejection/cancellation with release, fulfilment with commitment and the
//! paired delivery, and final delivery into the vendor's holdings.
//!
//! Each step after placement runs under the lock of the order's warehouse: the order is
//! re-read inside the lock, the command is decided against that fresh state, and every
//! lot, ledger, delivery and order write happens before the lock is released. The
//! order is still saved with an exact expected version. A fulfilment and a
//! cancellation of one order therefore serialize, and the loser sees the winner's
//! status.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use farmlink_core::{Aggregate, AggregateRoot, DeliveryId, DomainError, ExpectedVersion, GeoPoint, OrderId, UserId};
use farmlink_events::execute;
use farmlink_inventory::{InventoryLot, ReservationPlan};
use farmlink_orders::{
    ApproveOrder, CancelOrder, Delivery, DeliveryStatus, FulfillOrder, MarkOrderDelivered,
    OrderStatus, PlaceOrder, RecordReservations, RejectOrder, Stop, VendorOrder,
    VendorOrderCommand,
};
use farmlink_warehouse::{Candidate, CapacityChange, CapacityOp, ScoringPolicy};

use crate::alerts::{AlertSink, Alerting};
use crate::error::ServiceResult;
use crate::locks::LocationLocks;
use crate::repository::{DeliveryRepository, LotRepository, OrderRepository, Stores, WarehouseRepository};
use crate::services::{
    CapacityLedger, CommitOutcome, ReservationManager, UtilizationTracker, WarehouseSelector,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrderRequest {
    pub vendor: UserId,
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    /// When `None`, the warehouse selector picks one.
    pub warehouse_location: Option<String>,
    pub vendor_location: String,
    pub origin: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: VendorOrder,
    pub plan: ReservationPlan,
    /// Present when the warehouse was chosen by the selector.
    pub selection: Option<Candidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FulfilledOrder {
    pub order: VendorOrder,
    pub delivery_id: DeliveryId,
    /// `None` when the order had already been fulfilled.
    pub committed: Option<CommitOutcome>,
    pub capacity: Option<CapacityChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredOrder {
    pub order: VendorOrder,
    /// `None` when the order had already been marked delivered.
    pub vendor_lot: Option<InventoryLot>,
}

pub struct OrderWorkflow<W, L, O, D, A> {
    warehouses: W,
    lots: L,
    orders: O,
    deliveries: D,
    selector: WarehouseSelector<W, L>,
    reservations: ReservationManager<L, A>,
    ledger: CapacityLedger<W, L, A>,
    locks: Arc<LocationLocks>,
}

impl<W, L, O, D, A> OrderWorkflow<W, L, O, D, A>
where
    W: WarehouseRepository + Clone,
    L: LotRepository + Clone,
    O: OrderRepository + Clone,
    D: DeliveryRepository + Clone,
    A: AlertSink + Clone,
{
    pub fn new<U>(
        stores: &Stores<W, L, O, D, U>,
        policy: ScoringPolicy,
        alerting: Alerting<A>,
        locks: Arc<LocationLocks>,
    ) -> Self {
        let tracker = UtilizationTracker::new(stores.warehouses.clone(), stores.lots.clone());
        Self {
            warehouses: stores.warehouses.clone(),
            lots: stores.lots.clone(),
            orders: stores.orders.clone(),
            deliveries: stores.deliveries.clone(),
            selector: WarehouseSelector::new(tracker, policy),
            reservations: ReservationManager::new(stores.lots.clone(), locks.clone(), alerting.clone()),
            ledger: CapacityLedger::new(
                stores.warehouses.clone(),
                stores.lots.clone(),
                locks.clone(),
                alerting,
            ),
            locks,
        }
    }

    pub fn order(&self, id: OrderId) -> ServiceResult<VendorOrder> {
        Ok(self
            .orders
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))?)
    }

    /// Run `f` on a fresh read of the order while holding its warehouse's lock.
    ///
    /// An order's warehouse never changes after placement, so the unlocked first read
    /// only picks the lock.
    fn with_order<T>(
        &self,
        order_id: OrderId,
        f: impl FnOnce(VendorOrder) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let location = self.order(order_id)?.warehouse_location().to_string();
        self.locks
            .with_location(&location, || f(self.order(order_id)?))
    }

    /// Execute one command and persist the result against the version it was loaded at.
    fn transition(&self, mut order: VendorOrder, command: VendorOrderCommand) -> ServiceResult<VendorOrder> {
        let expected = ExpectedVersion::Exact(order.version());
        execute(&mut order, &command)?;
        self.orders.save(order.clone(), expected)?;
        Ok(order)
    }

    #[instrument(skip(self, request), fields(vendor = %request.vendor, item = %request.item_name))]
    pub fn place_order(&self, request: PlaceOrderRequest) -> ServiceResult<PlacedOrder> {
        let (location, selection) = match &request.warehouse_location {
            Some(location) => {
                if self.warehouses.get(location)?.is_none() {
                    return Err(DomainError::not_found(format!("warehouse '{location}'")).into());
                }
                (location.clone(), None)
            }
            None => {
                let candidate = self
                    .selector
                    .find_optimal_warehouse(request.origin.as_ref(), request.quantity, None)?
                    .ok_or_else(|| {
                        DomainError::capacity(format!(
                            "no warehouse can take an order of {} units",
                            request.quantity
                        ))
                    })?;
                (candidate.location().to_string(), Some(candidate))
            }
        };

        let order_id = OrderId::new();
        let now = Utc::now();
        let mut order = VendorOrder::empty(order_id);
        execute(
            &mut order,
            &VendorOrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                vendor: request.vendor,
                item_name: request.item_name.clone(),
                quantity: request.quantity,
                unit: request.unit.clone(),
                warehouse_location: location.clone(),
                vendor_location: request.vendor_location.clone(),
                occurred_at: now,
            }),
        )?;

        let plan = self
            .reservations
            .reserve(&location, order.item_name(), order.quantity())?;
        execute(
            &mut order,
            &VendorOrderCommand::RecordReservations(RecordReservations {
                order_id,
                reservations: plan.reservations.clone(),
                occurred_at: now,
            }),
        )?;

        if let Err(err) = self.orders.save(order.clone(), ExpectedVersion::Exact(0)) {
            // Compensate: the lots must not stay reserved for an order that was never stored.
            if let Err(release_err) = self.reservations.release(&location, &plan.reservations) {
                warn!(order_id = %order_id, error = %release_err, "failed to release reservations of unsaved order");
            }
            return Err(err.into());
        }

        info!(
            order_id = %order_id,
            location = %location,
            reserved = plan.covered,
            uncovered = plan.uncovered,
            "order placed"
        );
        Ok(PlacedOrder {
            order,
            plan,
            selection,
        })
    }

    #[instrument(skip(self))]
    pub fn approve(&self, order_id: OrderId, approved_by: UserId) -> ServiceResult<VendorOrder> {
        let order = self.with_order(order_id, |order| {
            self.transition(
                order,
                VendorOrderCommand::ApproveOrder(ApproveOrder {
                    order_id,
                    approved_by,
                    occurred_at: Utc::now(),
                }),
            )
        })?;
        info!(order_id = %order_id, "order approved");
        Ok(order)
    }

    /// Reject a pending order and release its lots.
    #[instrument(skip(self))]
    pub fn reject(&self, order_id: OrderId, rejected_by: UserId, reason: &str) -> ServiceResult<VendorOrder> {
        let order = self.with_order(order_id, |order| {
            let order = self.transition(
                order,
                VendorOrderCommand::RejectOrder(RejectOrder {
                    order_id,
                    rejected_by,
                    reason: reason.to_string(),
                    occurred_at: Utc::now(),
                }),
            )?;
            self.release_locked(&order)?;
            Ok(order)
        })?;
        info!(order_id = %order_id, "order rejected");
        Ok(order)
    }

    /// Cancel a pending or approved order and release its lots.
    #[instrument(skip(self))]
    pub fn cancel(&self, order_id: OrderId, cancelled_by: UserId, reason: &str) -> ServiceResult<VendorOrder> {
        let order = self.with_order(order_id, |order| {
            let order = self.transition(
                order,
                VendorOrderCommand::CancelOrder(CancelOrder {
                    order_id,
                    cancelled_by,
                    reason: reason.to_string(),
                    occurred_at: Utc::now(),
                }),
            )?;
            self.release_locked(&order)?;
            Ok(order)
        })?;
        info!(order_id = %order_id, "order cancelled");
        Ok(order)
    }

    /// Re-run the release of a rejected or cancelled order (safe to repeat).
    pub fn release_reservations(&self, order_id: OrderId) -> ServiceResult<usize> {
        self.with_order(order_id, |order| {
            if !matches!(order.status(), OrderStatus::Rejected | OrderStatus::Cancelled) {
                return Err(DomainError::invariant(format!(
                    "order {order_id} is {:?}; only rejected or cancelled orders release lots",
                    order.status()
                ))
                .into());
            }
            self.release_locked(&order)
        })
    }

    /// Caller must hold the order's warehouse lock.
    fn release_locked(&self, order: &VendorOrder) -> ServiceResult<usize> {
        self.reservations
            .release_locked(order.reservations(), Utc::now())
    }

    /// Commit the order's reservations, take the quantity off the warehouse ledger and
    /// create the paired delivery from the warehouse to the vendor.
    ///
    /// Repeating the call on a fulfilled order returns the existing delivery.
    #[instrument(skip(self))]
    pub fn fulfill(&self, order_id: OrderId, transporter: Option<UserId>) -> ServiceResult<FulfilledOrder> {
        self.with_order(order_id, |order| self.fulfill_locked(order, transporter))
    }

    fn fulfill_locked(&self, order: VendorOrder, transporter: Option<UserId>) -> ServiceResult<FulfilledOrder> {
        let order_id = order.id_typed();
        if let (OrderStatus::Fulfilled | OrderStatus::Delivered, Some(delivery_id)) =
            (order.status(), order.delivery())
        {
            return Ok(FulfilledOrder {
                order,
                delivery_id,
                committed: None,
                capacity: None,
            });
        }

        let now = Utc::now();
        let delivery_id = DeliveryId::new();
        let command = VendorOrderCommand::FulfillOrder(FulfillOrder {
            order_id,
            delivery_id,
            occurred_at: now,
        });
        // Decide before acting: an illegal transition must not commit any lot.
        order.handle(&command)?;

        let location = order.warehouse_location().to_string();
        let warehouse = self
            .warehouses
            .get(&location)?
            .ok_or_else(|| DomainError::not_found(format!("warehouse '{location}'")))?;
        let vendor = order
            .vendor()
            .ok_or_else(|| DomainError::invariant(format!("order {order_id} has no vendor")))?;

        let quantity = order.reserved_quantity();
        if quantity < order.quantity() {
            warn!(order_id = %order_id, ordered = order.quantity(), reserved = quantity, "fulfilling a partially reserved order");
        }

        let mut pickup = Stop::new(location.as_str());
        pickup.coordinates = warehouse.coordinates().copied();
        let mut delivery = Delivery::new(
            order.item_name(),
            quantity,
            order.unit(),
            pickup,
            Stop::new(order.vendor_location()),
            now,
        )?
        .with_id(delivery_id)
        .with_vendor(vendor)
        .with_order(order_id);
        if let Some(transporter) = transporter {
            delivery.assign(transporter, now)?;
        }

        let committed = self.reservations.commit_locked(order.reservations(), now)?;
        let capacity =
            self.ledger
                .update_capacity_locked(&location, committed.removed, CapacityOp::Remove)?;
        self.deliveries.save(delivery, ExpectedVersion::Exact(0))?;
        let order = self.transition(order, command)?;

        info!(
            order_id = %order_id,
            delivery_id = %delivery_id,
            removed = committed.removed,
            "order fulfilled"
        );
        Ok(FulfilledOrder {
            order,
            delivery_id,
            committed: Some(committed),
            capacity: Some(capacity),
        })
    }

    /// Close a fulfilled order once its paired delivery arrived; the goods become a
    /// vendor-owned lot at the vendor's location.
    ///
    /// Serialized with the order's other transitions, so a repeated or concurrent call
    /// sees `Delivered` and creates no second lot.
    #[instrument(skip(self))]
    pub fn mark_delivered(&self, order_id: OrderId) -> ServiceResult<DeliveredOrder> {
        self.with_order(order_id, |order| self.mark_delivered_locked(order))
    }

    fn mark_delivered_locked(&self, order: VendorOrder) -> ServiceResult<DeliveredOrder> {
        let order_id = order.id_typed();
        if order.status() == OrderStatus::Delivered {
            return Ok(DeliveredOrder {
                order,
                vendor_lot: None,
            });
        }

        let command = VendorOrderCommand::MarkOrderDelivered(MarkOrderDelivered {
            order_id,
            occurred_at: Utc::now(),
        });
        order.handle(&command)?;

        let delivery_id = order
            .delivery()
            .ok_or_else(|| DomainError::invariant(format!("order {order_id} has no delivery")))?;
        let delivery = self
            .deliveries
            .get(delivery_id)?
            .ok_or_else(|| DomainError::not_found(format!("delivery {delivery_id}")))?;
        if delivery.status() != DeliveryStatus::Delivered {
            return Err(DomainError::invariant(format!(
                "delivery {delivery_id} is {:?}, not delivered yet",
                delivery.status()
            ))
            .into());
        }
        let vendor = order
            .vendor()
            .ok_or_else(|| DomainError::invariant(format!("order {order_id} has no vendor")))?;

        // A lot left behind by an earlier attempt whose order save failed is reused.
        let existing = self
            .lots
            .list_owned_by(vendor)?
            .into_iter()
            .find(|l| l.source_delivery() == Some(delivery_id));
        let vendor_lot = match existing {
            Some(lot) => lot,
            None => {
                let lot = InventoryLot::new(
                    vendor,
                    order.item_name(),
                    delivery.quantity(),
                    order.unit(),
                    order.vendor_location(),
                    Utc::now(),
                )?
                .with_source_delivery(delivery_id);
                self.lots.insert(lot.clone())?;
                lot
            }
        };

        let order = self.transition(order, command)?;
        info!(order_id = %order_id, lot_id = %vendor_lot.id_typed(), "order delivered");
        Ok(DeliveredOrder {
            order,
            vendor_lot: Some(vendor_lot),
        })
    }
}
