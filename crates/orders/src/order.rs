use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{Aggregate, AggregateRoot, DeliveryId, DomainError, OrderId, UserId};
use farmlink_events::Event;
use farmlink_inventory::Reservation;

/// Vendor order status lifecycle.
///
/// pending → approved → fulfilled → delivered; pending → rejected;
/// pending/approved → cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Fulfilled,
    Delivered,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Cancelled | OrderStatus::Delivered
        )
    }
}

/// Aggregate root: VendorOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOrder {
    id: OrderId,
    vendor: Option<UserId>,
    item_name: String,
    quantity: i64,
    unit: String,
    warehouse_location: String,
    vendor_location: String,
    status: OrderStatus,
    reservations: Vec<Reservation>,
    delivery: Option<DeliveryId>,
    status_note: Option<String>,
    version: u64,
    created: bool,
}

impl VendorOrder {
    /// Create an empty, not-yet-placed aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            vendor: None,
            item_name: String::new(),
            quantity: 0,
            unit: String::new(),
            warehouse_location: String::new(),
            vendor_location: String::new(),
            status: OrderStatus::Pending,
            reservations: Vec::new(),
            delivery: None,
            status_note: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn vendor(&self) -> Option<UserId> {
        self.vendor
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn warehouse_location(&self) -> &str {
        &self.warehouse_location
    }

    pub fn vendor_location(&self) -> &str {
        &self.vendor_location
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn reserved_quantity(&self) -> i64 {
        self.reservations.iter().map(|r| r.reserved_quantity).sum()
    }

    pub fn delivery(&self) -> Option<DeliveryId> {
        self.delivery
    }

    /// Reason recorded on rejection or cancellation.
    pub fn status_note(&self) -> Option<&str> {
        self.status_note.as_deref()
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for VendorOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub vendor: UserId,
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    pub warehouse_location: String,
    pub vendor_location: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordReservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReservations {
    pub order_id: OrderId,
    pub reservations: Vec<Reservation>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveOrder {
    pub order_id: OrderId,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectOrder {
    pub order_id: OrderId,
    pub rejected_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub cancelled_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FulfillOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillOrder {
    pub order_id: OrderId,
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkOrderDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOrderDelivered {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorOrderCommand {
    PlaceOrder(PlaceOrder),
    RecordReservations(RecordReservations),
    ApproveOrder(ApproveOrder),
    RejectOrder(RejectOrder),
    CancelOrder(CancelOrder),
    FulfillOrder(FulfillOrder),
    MarkOrderDelivered(MarkOrderDelivered),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub vendor: UserId,
    pub item_name: String,
    pub quantity: i64,
    pub unit: String,
    pub warehouse_location: String,
    pub vendor_location: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotsReserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotsReserved {
    pub order_id: OrderId,
    pub reservations: Vec<Reservation>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderApproved {
    pub order_id: OrderId,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub order_id: OrderId,
    pub rejected_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub cancelled_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderFulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFulfilled {
    pub order_id: OrderId,
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDelivered {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorOrderEvent {
    OrderPlaced(OrderPlaced),
    LotsReserved(LotsReserved),
    OrderApproved(OrderApproved),
    OrderRejected(OrderRejected),
    OrderCancelled(OrderCancelled),
    OrderFulfilled(OrderFulfilled),
    OrderDelivered(OrderDelivered),
}

impl Event for VendorOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            VendorOrderEvent::OrderPlaced(_) => "order.placed",
            VendorOrderEvent::LotsReserved(_) => "order.lots_reserved",
            VendorOrderEvent::OrderApproved(_) => "order.approved",
            VendorOrderEvent::OrderRejected(_) => "order.rejected",
            VendorOrderEvent::OrderCancelled(_) => "order.cancelled",
            VendorOrderEvent::OrderFulfilled(_) => "order.fulfilled",
            VendorOrderEvent::OrderDelivered(_) => "order.delivered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            VendorOrderEvent::OrderPlaced(e) => e.occurred_at,
            VendorOrderEvent::LotsReserved(e) => e.occurred_at,
            VendorOrderEvent::OrderApproved(e) => e.occurred_at,
            VendorOrderEvent::OrderRejected(e) => e.occurred_at,
            VendorOrderEvent::OrderCancelled(e) => e.occurred_at,
            VendorOrderEvent::OrderFulfilled(e) => e.occurred_at,
            VendorOrderEvent::OrderDelivered(e) => e.occurred_at,
        }
    }
}

impl Aggregate for VendorOrder {
    type Command = VendorOrderCommand;
    type Event = VendorOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            VendorOrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.vendor = Some(e.vendor);
                self.item_name = e.item_name.clone();
                self.quantity = e.quantity;
                self.unit = e.unit.clone();
                self.warehouse_location = e.warehouse_location.clone();
                self.vendor_location = e.vendor_location.clone();
                self.status = OrderStatus::Pending;
                self.reservations.clear();
                self.created = true;
            }
            VendorOrderEvent::LotsReserved(e) => {
                self.reservations.extend(e.reservations.iter().copied());
            }
            VendorOrderEvent::OrderApproved(_) => {
                self.status = OrderStatus::Approved;
            }
            VendorOrderEvent::OrderRejected(e) => {
                self.status = OrderStatus::Rejected;
                self.status_note = Some(e.reason.clone());
            }
            VendorOrderEvent::OrderCancelled(e) => {
                self.status = OrderStatus::Cancelled;
                self.status_note = Some(e.reason.clone());
            }
            VendorOrderEvent::OrderFulfilled(e) => {
                self.status = OrderStatus::Fulfilled;
                self.delivery = Some(e.delivery_id);
            }
            VendorOrderEvent::OrderDelivered(_) => {
                self.status = OrderStatus::Delivered;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            VendorOrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            VendorOrderCommand::RecordReservations(cmd) => self.handle_record_reservations(cmd),
            VendorOrderCommand::ApproveOrder(cmd) => self.handle_approve(cmd),
            VendorOrderCommand::RejectOrder(cmd) => self.handle_reject(cmd),
            VendorOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
            VendorOrderCommand::FulfillOrder(cmd) => self.handle_fulfill(cmd),
            VendorOrderCommand::MarkOrderDelivered(cmd) => self.handle_mark_delivered(cmd),
        }
    }
}

impl VendorOrder {
    fn ensure_placed(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[OrderStatus], action: &str) -> Result<(), DomainError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(DomainError::invariant(format!(
            "cannot {action} an order that is {:?}",
            self.status
        )))
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<VendorOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }
        if cmd.item_name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if cmd.warehouse_location.trim().is_empty() {
            return Err(DomainError::validation("warehouse location cannot be empty"));
        }
        if cmd.vendor_location.trim().is_empty() {
            return Err(DomainError::validation("vendor location cannot be empty"));
        }

        Ok(vec![VendorOrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            vendor: cmd.vendor,
            item_name: cmd.item_name.trim().to_string(),
            quantity: cmd.quantity,
            unit: cmd.unit.clone(),
            warehouse_location: cmd.warehouse_location.clone(),
            vendor_location: cmd.vendor_location.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_reservations(
        &self,
        cmd: &RecordReservations,
    ) -> Result<Vec<VendorOrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending, OrderStatus::Approved], "reserve lots for")?;

        if cmd.reservations.is_empty() {
            return Ok(Vec::new());
        }
        if cmd.reservations.iter().any(|r| r.reserved_quantity <= 0) {
            return Err(DomainError::validation("reserved quantity must be positive"));
        }

        Ok(vec![VendorOrderEvent::LotsReserved(LotsReserved {
            order_id: cmd.order_id,
            reservations: cmd.reservations.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveOrder) -> Result<Vec<VendorOrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending], "approve")?;

        Ok(vec![VendorOrderEvent::OrderApproved(OrderApproved {
            order_id: cmd.order_id,
            approved_by: cmd.approved_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectOrder) -> Result<Vec<VendorOrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending], "reject")?;

        Ok(vec![VendorOrderEvent::OrderRejected(OrderRejected {
            order_id: cmd.order_id,
            rejected_by: cmd.rejected_by,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<VendorOrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Pending, OrderStatus::Approved], "cancel")?;

        Ok(vec![VendorOrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            cancelled_by: cmd.cancelled_by,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_fulfill(&self, cmd: &FulfillOrder) -> Result<Vec<VendorOrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Approved], "fulfill")?;

        if self.reservations.is_empty() {
            return Err(DomainError::invariant(
                "cannot fulfill an order without reserved lots",
            ));
        }

        Ok(vec![VendorOrderEvent::OrderFulfilled(OrderFulfilled {
            order_id: cmd.order_id,
            delivery_id: cmd.delivery_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_delivered(
        &self,
        cmd: &MarkOrderDelivered,
    ) -> Result<Vec<VendorOrderEvent>, DomainError> {
        self.ensure_placed(cmd.order_id)?;
        self.ensure_status(&[OrderStatus::Fulfilled], "mark delivered")?;

        Ok(vec![VendorOrderEvent::OrderDelivered(OrderDelivered {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
