use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{DeliveryId, DomainError, DomainResult, Entity, GeoPoint, OrderId, UserId};

/// Delivery status lifecycle: pending → assigned → in_transit → delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    InTransit,
    Delivered,
}

/// Pickup or dropoff descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub address: String,
    pub coordinates: Option<GeoPoint>,
}

impl Stop {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            coordinates: None,
        }
    }

    pub fn at(mut self, coordinates: GeoPoint) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

/// A movement of goods between a farmer, a warehouse and a vendor.
///
/// The inventory bridge reads `status`, `quantity`, `goods_description` and the stops,
/// and sets the three one-shot markers (`received_by_warehouse`,
/// `dispatched_from_warehouse`, `farmer_stock_consumed`). `version` goes up by one on
/// every mutation, for optimistic saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    id: DeliveryId,
    farmer: Option<UserId>,
    transporter: Option<UserId>,
    vendor: Option<UserId>,
    order: Option<OrderId>,
    goods_description: String,
    quantity: i64,
    unit: String,
    pickup: Stop,
    dropoff: Stop,
    status: DeliveryStatus,
    received_by_warehouse: bool,
    dispatched_from_warehouse: bool,
    farmer_stock_consumed: bool,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl Delivery {
    pub fn new(
        goods_description: impl Into<String>,
        quantity: i64,
        unit: impl Into<String>,
        pickup: Stop,
        dropoff: Stop,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let goods_description = goods_description.into();
        if goods_description.trim().is_empty() {
            return Err(DomainError::validation("goods description cannot be empty"));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("delivery quantity must be positive"));
        }

        Ok(Self {
            id: DeliveryId::new(),
            farmer: None,
            transporter: None,
            vendor: None,
            order: None,
            goods_description,
            quantity,
            unit: unit.into(),
            pickup,
            dropoff,
            status: DeliveryStatus::Pending,
            received_by_warehouse: false,
            dispatched_from_warehouse: false,
            farmer_stock_consumed: false,
            version: 0,
            created_at,
            updated_at: created_at,
            delivered_at: None,
        })
    }

    pub fn with_id(mut self, id: DeliveryId) -> Self {
        self.id = id;
        self
    }

    pub fn with_farmer(mut self, farmer: UserId) -> Self {
        self.farmer = Some(farmer);
        self
    }

    pub fn with_vendor(mut self, vendor: UserId) -> Self {
        self.vendor = Some(vendor);
        self
    }

    pub fn with_order(mut self, order: OrderId) -> Self {
        self.order = Some(order);
        self
    }

    pub fn id_typed(&self) -> DeliveryId {
        self.id
    }

    pub fn farmer(&self) -> Option<UserId> {
        self.farmer
    }

    pub fn transporter(&self) -> Option<UserId> {
        self.transporter
    }

    pub fn vendor(&self) -> Option<UserId> {
        self.vendor
    }

    pub fn order(&self) -> Option<OrderId> {
        self.order
    }

    pub fn goods_description(&self) -> &str {
        &self.goods_description
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn pickup(&self) -> &Stop {
        &self.pickup
    }

    pub fn dropoff(&self) -> &Stop {
        &self.dropoff
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn received_by_warehouse(&self) -> bool {
        self.received_by_warehouse
    }

    pub fn dispatched_from_warehouse(&self) -> bool {
        self.dispatched_from_warehouse
    }

    pub fn farmer_stock_consumed(&self) -> bool {
        self.farmer_stock_consumed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    fn transition(
        &mut self,
        from: DeliveryStatus,
        to: DeliveryStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != from {
            return Err(DomainError::invariant(format!(
                "delivery {} is {:?}, expected {:?} before moving to {:?}",
                self.id, self.status, from, to
            )));
        }
        self.status = to;
        self.touch(at);
        Ok(())
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = at;
    }

    /// Set a one-shot marker, or fail with a conflict if it is already set.
    fn mark_once(
        &mut self,
        flag: fn(&mut Self) -> &mut bool,
        what: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let id = self.id;
        let marker = flag(self);
        if *marker {
            return Err(DomainError::conflict(format!("delivery {id} was already {what}")));
        }
        *marker = true;
        self.touch(at);
        Ok(())
    }

    pub fn assign(&mut self, transporter: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(DeliveryStatus::Pending, DeliveryStatus::Assigned, at)?;
        self.transporter = Some(transporter);
        Ok(())
    }

    pub fn start_transit(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(DeliveryStatus::Assigned, DeliveryStatus::InTransit, at)
    }

    pub fn mark_delivered(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(DeliveryStatus::InTransit, DeliveryStatus::Delivered, at)?;
        self.delivered_at = Some(at);
        Ok(())
    }

    /// Flag the delivery as stocked into a warehouse. A second receipt is a conflict.
    pub fn mark_received_by_warehouse(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.mark_once(|d| &mut d.received_by_warehouse, "received into a warehouse", at)
    }

    pub fn mark_dispatched_from_warehouse(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.mark_once(|d| &mut d.dispatched_from_warehouse, "dispatched from a warehouse", at)
    }

    /// Flag the farmer's own lots as drained for this delivery.
    pub fn mark_farmer_stock_consumed(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.mark_once(|d| &mut d.farmer_stock_consumed, "deducted from the farmer's stock", at)
    }
}

impl Entity for Delivery {
    type Id = DeliveryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery() -> Delivery {
        Delivery::new(
            "Irish potatoes",
            120,
            "bags",
            Stop::new("Molo farm"),
            Stop::new("Nakuru warehouse"),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn walks_the_status_machine() {
        let mut d = delivery();
        let transporter = UserId::new();
        d.assign(transporter, Utc::now()).unwrap();
        d.start_transit(Utc::now()).unwrap();
        d.mark_delivered(Utc::now()).unwrap();

        assert_eq!(d.status(), DeliveryStatus::Delivered);
        assert_eq!(d.transporter(), Some(transporter));
        assert!(d.delivered_at().is_some());
    }

    #[test]
    fn cannot_skip_states() {
        let mut d = delivery();
        let err = d.mark_delivered(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(d.status(), DeliveryStatus::Pending);
    }

    #[test]
    fn second_receipt_conflicts() {
        let mut d = delivery();
        d.mark_received_by_warehouse(Utc::now()).unwrap();
        assert!(matches!(
            d.mark_received_by_warehouse(Utc::now()),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn markers_are_independent_and_bump_the_version() {
        let mut d = delivery();
        d.mark_farmer_stock_consumed(Utc::now()).unwrap();
        d.mark_received_by_warehouse(Utc::now()).unwrap();
        assert_eq!(d.version(), 2);
        assert!(!d.dispatched_from_warehouse());

        d.mark_dispatched_from_warehouse(Utc::now()).unwrap();
        let err = d.mark_dispatched_from_warehouse(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(d.version(), 3);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(
            Delivery::new("Milk", 0, "l", Stop::new("a"), Stop::new("b"), Utc::now()).is_err()
        );
    }
}
