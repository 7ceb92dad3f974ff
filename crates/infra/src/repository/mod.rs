//! Storage seams.
//!
//! Services depend on these traits only; the in-memory adapters back tests and
//! single-process deployments. Aggregations (`LotRepository::sum_at`) are explicit
//! queries so a storage engine can push them down.

use std::sync::Arc;

use farmlink_auth::Principal;
use farmlink_core::{DeliveryId, ExpectedVersion, LotId, OrderId, UserId};
use farmlink_inventory::InventoryLot;
use farmlink_orders::{Delivery, VendorOrder};
use farmlink_warehouse::Warehouse;

use crate::error::RepoResult;

pub mod in_memory;

pub use in_memory::{
    InMemoryDeliveryRepository, InMemoryLotRepository, InMemoryOrderRepository,
    InMemoryUserDirectory, InMemoryWarehouseRepository,
};

/// Warehouse records keyed by location.
pub trait WarehouseRepository: Send + Sync {
    fn get(&self, location: &str) -> RepoResult<Option<Warehouse>>;
    /// Every warehouse, in registration order.
    fn list(&self) -> RepoResult<Vec<Warehouse>>;
    fn upsert(&self, warehouse: Warehouse) -> RepoResult<()>;
}

pub trait LotRepository: Send + Sync {
    fn get(&self, id: LotId) -> RepoResult<Option<InventoryLot>>;
    /// Fails with `Conflict` if the id is already stored.
    fn insert(&self, lot: InventoryLot) -> RepoResult<()>;
    /// Fails with `NotFound` if the lot was removed meanwhile.
    fn update(&self, lot: InventoryLot) -> RepoResult<()>;
    fn remove(&self, id: LotId) -> RepoResult<Option<InventoryLot>>;
    fn list_at(&self, location: &str) -> RepoResult<Vec<InventoryLot>>;
    fn list_owned_by(&self, owner: UserId) -> RepoResult<Vec<InventoryLot>>;
    /// Sum of lot quantities at `location`, whatever their status.
    fn sum_at(&self, location: &str) -> RepoResult<i64>;
}

/// Order snapshots with optimistic concurrency on the aggregate version.
pub trait OrderRepository: Send + Sync {
    fn get(&self, id: OrderId) -> RepoResult<Option<VendorOrder>>;
    /// `expected` is checked against the stored version (0 when absent).
    fn save(&self, order: VendorOrder, expected: ExpectedVersion) -> RepoResult<()>;
}

/// Delivery records with optimistic concurrency on `Delivery::version`.
pub trait DeliveryRepository: Send + Sync {
    fn get(&self, id: DeliveryId) -> RepoResult<Option<Delivery>>;
    /// `expected` is checked against the stored version (0 when absent), so a save
    /// built from a stale read fails with `Conflict`.
    fn save(&self, delivery: Delivery, expected: ExpectedVersion) -> RepoResult<()>;
}

/// Read-only view of the user base, for owner resolution.
pub trait UserDirectory: Send + Sync {
    fn find_admin(&self) -> RepoResult<Option<UserId>>;
    fn manager_at(&self, location: &str) -> RepoResult<Option<UserId>>;
    fn principal(&self, id: UserId) -> RepoResult<Option<Principal>>;
}

impl<S> WarehouseRepository for Arc<S>
where
    S: WarehouseRepository + ?Sized,
{
    fn get(&self, location: &str) -> RepoResult<Option<Warehouse>> {
        (**self).get(location)
    }

    fn list(&self) -> RepoResult<Vec<Warehouse>> {
        (**self).list()
    }

    fn upsert(&self, warehouse: Warehouse) -> RepoResult<()> {
        (**self).upsert(warehouse)
    }
}

impl<S> LotRepository for Arc<S>
where
    S: LotRepository + ?Sized,
{
    fn get(&self, id: LotId) -> RepoResult<Option<InventoryLot>> {
        (**self).get(id)
    }

    fn insert(&self, lot: InventoryLot) -> RepoResult<()> {
        (**self).insert(lot)
    }

    fn update(&self, lot: InventoryLot) -> RepoResult<()> {
        (**self).update(lot)
    }

    fn remove(&self, id: LotId) -> RepoResult<Option<InventoryLot>> {
        (**self).remove(id)
    }

    fn list_at(&self, location: &str) -> RepoResult<Vec<InventoryLot>> {
        (**self).list_at(location)
    }

    fn list_owned_by(&self, owner: UserId) -> RepoResult<Vec<InventoryLot>> {
        (**self).list_owned_by(owner)
    }

    fn sum_at(&self, location: &str) -> RepoResult<i64> {
        (**self).sum_at(location)
    }
}

impl<S> OrderRepository for Arc<S>
where
    S: OrderRepository + ?Sized,
{
    fn get(&self, id: OrderId) -> RepoResult<Option<VendorOrder>> {
        (**self).get(id)
    }

    fn save(&self, order: VendorOrder, expected: ExpectedVersion) -> RepoResult<()> {
        (**self).save(order, expected)
    }
}

impl<S> DeliveryRepository for Arc<S>
where
    S: DeliveryRepository + ?Sized,
{
    fn get(&self, id: DeliveryId) -> RepoResult<Option<Delivery>> {
        (**self).get(id)
    }

    fn save(&self, delivery: Delivery, expected: ExpectedVersion) -> RepoResult<()> {
        (**self).save(delivery, expected)
    }
}

impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    fn find_admin(&self) -> RepoResult<Option<UserId>> {
        (**self).find_admin()
    }

    fn manager_at(&self, location: &str) -> RepoResult<Option<UserId>> {
        (**self).manager_at(location)
    }

    fn principal(&self, id: UserId) -> RepoResult<Option<Principal>> {
        (**self).principal(id)
    }
}

/// The full set of stores a deployment wires into its services.
#[derive(Debug, Clone)]
pub struct Stores<W, L, O, D, U> {
    pub warehouses: W,
    pub lots: L,
    pub orders: O,
    pub deliveries: D,
    pub users: U,
}

pub type InMemoryStores = Stores<
    Arc<InMemoryWarehouseRepository>,
    Arc<InMemoryLotRepository>,
    Arc<InMemoryOrderRepository>,
    Arc<InMemoryDeliveryRepository>,
    Arc<InMemoryUserDirectory>,
>;

impl InMemoryStores {
    pub fn in_memory() -> Self {
        Stores {
            warehouses: Arc::new(InMemoryWarehouseRepository::new()),
            lots: Arc::new(InMemoryLotRepository::new()),
            orders: Arc::new(InMemoryOrderRepository::new()),
            deliveries: Arc::new(InMemoryDeliveryRepository::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
        }
    }
}
