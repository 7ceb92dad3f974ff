//! Inventory lots: a quantity of one item, owned by one user, at one location.
//!
//! A lot moves available → reserved → sold (or back to available when a reservation
//! is released or only partly committed). Quantities never go below zero; notes are
//! append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::{DeliveryId, DomainError, DomainResult, Entity, LotId, UserId};

use crate::Category;

/// Lot lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Available,
    Reserved,
    Sold,
}

/// Audit note appended on manual adjustments and partial consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotNote {
    pub author: Option<UserId>,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Outcome of committing a reservation against a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    /// Units actually removed (never more than the lot held).
    pub removed: i64,
    pub remaining: i64,
    pub status: LotStatus,
}

/// One quantity-bearing inventory record owned by a farmer, warehouse manager or vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    id: LotId,
    owner: UserId,
    item_name: String,
    quantity: i64,
    unit: String,
    location: String,
    status: LotStatus,
    category: Category,
    notes: Vec<LotNote>,
    source_delivery: Option<DeliveryId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryLot {
    /// New available lot. The category is derived from `item_name`.
    pub fn new(
        owner: UserId,
        item_name: impl Into<String>,
        quantity: i64,
        unit: impl Into<String>,
        location: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let item_name = item_name.into();
        let location = location.into();

        if item_name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if location.trim().is_empty() {
            return Err(DomainError::validation("lot location cannot be empty"));
        }
        if quantity < 0 {
            return Err(DomainError::validation("lot quantity cannot be negative"));
        }

        Ok(Self {
            id: LotId::new(),
            owner,
            category: Category::classify(&item_name),
            item_name,
            quantity,
            unit: unit.into(),
            location,
            status: LotStatus::Available,
            notes: Vec::new(),
            source_delivery: None,
            created_at,
            updated_at: created_at,
        })
    }

    pub fn with_id(mut self, id: LotId) -> Self {
        self.id = id;
        self
    }

    /// Override the keyword-derived category (e.g. from a goods description).
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_source_delivery(mut self, delivery: DeliveryId) -> Self {
        self.source_delivery = Some(delivery);
        self
    }

    pub fn id_typed(&self) -> LotId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
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

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn status(&self) -> LotStatus {
        self.status
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn notes(&self) -> &[LotNote] {
        &self.notes
    }

    pub fn source_delivery(&self) -> Option<DeliveryId> {
        self.source_delivery
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_available(&self) -> bool {
        self.status == LotStatus::Available
    }

    /// Item names match case-insensitively, ignoring surrounding whitespace.
    pub fn matches_item(&self, item_name: &str) -> bool {
        self.item_name.trim().eq_ignore_ascii_case(item_name.trim())
    }

    /// Flip an available lot to reserved. Quantity is untouched.
    pub fn reserve(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != LotStatus::Available {
            return Err(DomainError::invariant(format!(
                "lot {} is {:?}, only available lots can be reserved",
                self.id, self.status
            )));
        }
        self.status = LotStatus::Reserved;
        self.updated_at = at;
        Ok(())
    }

    /// Revert a reserved lot to available. Returns false if the lot was not reserved.
    pub fn release(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != LotStatus::Reserved {
            return false;
        }
        self.status = LotStatus::Available;
        self.updated_at = at;
        true
    }

    /// Deduct a reserved quantity. At zero the lot is sold, otherwise the remainder is
    /// available again.
    pub fn commit(&mut self, reserved_quantity: i64, at: DateTime<Utc>) -> DomainResult<Committed> {
        if self.status != LotStatus::Reserved {
            return Err(DomainError::invariant(format!(
                "lot {} is {:?}, only reserved lots can be committed",
                self.id, self.status
            )));
        }
        if reserved_quantity < 0 {
            return Err(DomainError::validation("reserved quantity cannot be negative"));
        }

        let removed = reserved_quantity.min(self.quantity);
        let remaining = self.quantity - reserved_quantity;
        if remaining <= 0 {
            self.quantity = 0;
            self.status = LotStatus::Sold;
        } else {
            self.quantity = remaining;
            self.status = LotStatus::Available;
        }
        self.updated_at = at;

        Ok(Committed {
            removed,
            remaining: self.quantity,
            status: self.status,
        })
    }

    /// Remove up to `amount` units, flooring at zero. Returns the units actually taken.
    pub fn take(&mut self, amount: i64, at: DateTime<Utc>) -> DomainResult<i64> {
        if amount <= 0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        let taken = amount.min(self.quantity);
        self.quantity -= taken;
        self.updated_at = at;
        Ok(taken)
    }

    pub fn add(&mut self, amount: i64, at: DateTime<Utc>) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        self.quantity = self.quantity.saturating_add(amount);
        self.updated_at = at;
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: i64, at: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("lot quantity cannot be negative"));
        }
        self.quantity = quantity;
        self.updated_at = at;
        Ok(())
    }

    pub fn append_note(&mut self, author: Option<UserId>, text: impl Into<String>, at: DateTime<Utc>) {
        self.notes.push(LotNote {
            author,
            text: text.into(),
            at,
        });
        self.updated_at = at;
    }
}

impl Entity for InventoryLot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(sec: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + sec, 0).unwrap()
    }

    fn lot(quantity: i64) -> InventoryLot {
        InventoryLot::new(UserId::new(), "Maize", quantity, "kg", "Thika", t(0)).unwrap()
    }

    #[test]
    fn new_lot_is_available_and_classified() {
        let l = lot(30);
        assert_eq!(l.status(), LotStatus::Available);
        assert_eq!(l.category(), Category::Grains);
        assert_eq!(l.created_at(), l.updated_at());
    }

    #[test]
    fn rejects_empty_location_and_negative_quantity() {
        let owner = UserId::new();
        assert!(matches!(
            InventoryLot::new(owner, "Maize", 1, "kg", "  ", t(0)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            InventoryLot::new(owner, "Maize", -1, "kg", "Thika", t(0)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn reserve_twice_is_invariant_violation() {
        let mut l = lot(30);
        l.reserve(t(1)).unwrap();
        let err = l.reserve(t(2)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn commit_partial_returns_remainder_to_available() {
        let mut l = lot(40);
        l.reserve(t(1)).unwrap();
        let c = l.commit(20, t(2)).unwrap();
        assert_eq!(c, Committed { removed: 20, remaining: 20, status: LotStatus::Available });
        assert_eq!(l.quantity(), 20);
    }

    #[test]
    fn commit_full_marks_sold() {
        let mut l = lot(30);
        l.reserve(t(1)).unwrap();
        let c = l.commit(30, t(2)).unwrap();
        assert_eq!(c.status, LotStatus::Sold);
        assert_eq!(l.quantity(), 0);
    }

    #[test]
    fn commit_requires_reservation() {
        let mut l = lot(30);
        assert!(l.commit(10, t(1)).is_err());
        assert_eq!(l.quantity(), 30);
    }

    #[test]
    fn release_only_touches_reserved_lots() {
        let mut l = lot(30);
        assert!(!l.release(t(1)));
        l.reserve(t(1)).unwrap();
        assert!(l.release(t(2)));
        assert!(l.is_available());
    }

    #[test]
    fn take_floors_at_zero() {
        let mut l = lot(5);
        assert_eq!(l.take(8, t(1)).unwrap(), 5);
        assert_eq!(l.quantity(), 0);
    }

    #[test]
    fn matches_item_ignores_case_and_whitespace() {
        let l = lot(1);
        assert!(l.matches_item(" maize "));
        assert!(!l.matches_item("maize flour"));
    }
}
