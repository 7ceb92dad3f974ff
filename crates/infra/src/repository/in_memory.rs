//! In-memory adapters for tests/dev and single-process deployments.
//!
//! Not optimized for performance: lookups are linear where ordering matters.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use farmlink_auth::{Principal, Role};
use farmlink_core::{AggregateRoot, DeliveryId, Entity, ExpectedVersion, LotId, OrderId, UserId};
use farmlink_inventory::InventoryLot;
use farmlink_orders::{Delivery, VendorOrder};
use farmlink_warehouse::Warehouse;

use super::{DeliveryRepository, LotRepository, OrderRepository, UserDirectory, WarehouseRepository};
use crate::error::{RepoResult, RepositoryError};

/// Records keyed by their `Entity::id`.
#[derive(Debug)]
struct EntityTable<E: Entity> {
    name: &'static str,
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity + Clone> EntityTable<E> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, HashMap<E::Id, E>>> {
        self.inner.read().map_err(|_| RepositoryError::Poisoned(self.name))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, HashMap<E::Id, E>>> {
        self.inner.write().map_err(|_| RepositoryError::Poisoned(self.name))
    }

    fn get(&self, id: &E::Id) -> RepoResult<Option<E>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn insert(&self, record: E) -> RepoResult<()> {
        let mut map = self.write()?;
        let id = record.id().clone();
        if map.contains_key(&id) {
            return Err(RepositoryError::Conflict(format!("{} {id} already exists", self.name)));
        }
        map.insert(id, record);
        Ok(())
    }

    fn replace(&self, record: E) -> RepoResult<()> {
        let mut map = self.write()?;
        match map.get_mut(record.id()) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("{} {}", self.name, record.id()))),
        }
    }

    /// Store `record` if `current` (the stored record, if any) passes `check`.
    fn compare_and_set(
        &self,
        record: E,
        check: impl FnOnce(Option<&E>) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let mut map = self.write()?;
        check(map.get(record.id()))?;
        map.insert(record.id().clone(), record);
        Ok(())
    }

    fn remove(&self, id: &E::Id) -> RepoResult<Option<E>> {
        Ok(self.write()?.remove(id))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWarehouseRepository {
    // Vec keeps registration order, which the selector's tie-break relies on.
    inner: RwLock<Vec<Warehouse>>,
}

impl InMemoryWarehouseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WarehouseRepository for InMemoryWarehouseRepository {
    fn get(&self, location: &str) -> RepoResult<Option<Warehouse>> {
        let all = self
            .inner
            .read()
            .map_err(|_| RepositoryError::Poisoned("warehouse"))?;
        Ok(all.iter().find(|w| w.id() == location).cloned())
    }

    fn list(&self) -> RepoResult<Vec<Warehouse>> {
        let all = self
            .inner
            .read()
            .map_err(|_| RepositoryError::Poisoned("warehouse"))?;
        Ok(all.clone())
    }

    fn upsert(&self, warehouse: Warehouse) -> RepoResult<()> {
        let mut all = self
            .inner
            .write()
            .map_err(|_| RepositoryError::Poisoned("warehouse"))?;
        match all.iter_mut().find(|w| w.id() == warehouse.id()) {
            Some(existing) => *existing = warehouse,
            None => all.push(warehouse),
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryLotRepository {
    table: EntityTable<InventoryLot>,
}

impl Default for InMemoryLotRepository {
    fn default() -> Self {
        Self {
            table: EntityTable::new("lot"),
        }
    }
}

impl InMemoryLotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted<F>(&self, keep: F) -> RepoResult<Vec<InventoryLot>>
    where
        F: Fn(&InventoryLot) -> bool,
    {
        let map = self.table.read()?;
        let mut lots: Vec<InventoryLot> = map.values().filter(|l| keep(l)).cloned().collect();
        lots.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id_typed().cmp(&b.id_typed()))
        });
        Ok(lots)
    }
}

impl LotRepository for InMemoryLotRepository {
    fn get(&self, id: LotId) -> RepoResult<Option<InventoryLot>> {
        self.table.get(&id)
    }

    fn insert(&self, lot: InventoryLot) -> RepoResult<()> {
        self.table.insert(lot)
    }

    fn update(&self, lot: InventoryLot) -> RepoResult<()> {
        self.table.replace(lot)
    }

    fn remove(&self, id: LotId) -> RepoResult<Option<InventoryLot>> {
        self.table.remove(&id)
    }

    fn list_at(&self, location: &str) -> RepoResult<Vec<InventoryLot>> {
        self.collect_sorted(|l| l.location() == location)
    }

    fn list_owned_by(&self, owner: UserId) -> RepoResult<Vec<InventoryLot>> {
        self.collect_sorted(|l| l.owner() == owner)
    }

    fn sum_at(&self, location: &str) -> RepoResult<i64> {
        Ok(self
            .table
            .read()?
            .values()
            .filter(|l| l.location() == location)
            .map(InventoryLot::quantity)
            .sum())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<HashMap<OrderId, VendorOrder>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn get(&self, id: OrderId) -> RepoResult<Option<VendorOrder>> {
        let map = self
            .inner
            .read()
            .map_err(|_| RepositoryError::Poisoned("order"))?;
        Ok(map.get(&id).cloned())
    }

    fn save(&self, order: VendorOrder, expected: ExpectedVersion) -> RepoResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| RepositoryError::Poisoned("order"))?;
        let id = order.id_typed();
        let current = map.get(&id).map(|o| o.version()).unwrap_or(0);

        if !expected.matches(current) {
            return Err(RepositoryError::Conflict(format!(
                "order {id}: expected {expected:?}, found version {current}"
            )));
        }

        map.insert(id, order);
        Ok(())
    }
}

#[derive(Debug)]
pub struct InMemoryDeliveryRepository {
    table: EntityTable<Delivery>,
}

impl Default for InMemoryDeliveryRepository {
    fn default() -> Self {
        Self {
            table: EntityTable::new("delivery"),
        }
    }
}

impl InMemoryDeliveryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeliveryRepository for InMemoryDeliveryRepository {
    fn get(&self, id: DeliveryId) -> RepoResult<Option<Delivery>> {
        self.table.get(&id)
    }

    fn save(&self, delivery: Delivery, expected: ExpectedVersion) -> RepoResult<()> {
        let id = delivery.id_typed();
        self.table.compare_and_set(delivery, |stored| {
            let current = stored.map(Delivery::version).unwrap_or(0);
            if expected.matches(current) {
                Ok(())
            } else {
                Err(RepositoryError::Conflict(format!(
                    "delivery {id}: expected {expected:?}, found version {current}"
                )))
            }
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    inner: RwLock<Vec<Principal>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, principal: Principal) -> RepoResult<()> {
        let mut users = self
            .inner
            .write()
            .map_err(|_| RepositoryError::Poisoned("user"))?;
        users.retain(|p| p.user_id != principal.user_id);
        users.push(principal);
        Ok(())
    }

    fn find<F>(&self, pred: F) -> RepoResult<Option<Principal>>
    where
        F: Fn(&Principal) -> bool,
    {
        let users = self
            .inner
            .read()
            .map_err(|_| RepositoryError::Poisoned("user"))?;
        Ok(users.iter().find(|p| pred(p)).cloned())
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_admin(&self) -> RepoResult<Option<UserId>> {
        Ok(self.find(|p| p.role == Role::Admin)?.map(|p| p.user_id))
    }

    fn manager_at(&self, location: &str) -> RepoResult<Option<UserId>> {
        Ok(self
            .find(|p| p.role == Role::WarehouseManager && p.location.as_deref() == Some(location))?
            .map(|p| p.user_id))
    }

    fn principal(&self, id: UserId) -> RepoResult<Option<Principal>> {
        self.find(|p| p.user_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use farmlink_core::Aggregate;
    use farmlink_orders::{PlaceOrder, VendorOrderCommand};

    #[test]
    fn warehouses_keep_registration_order() {
        let repo = InMemoryWarehouseRepository::new();
        repo.upsert(Warehouse::new("B", 10).unwrap()).unwrap();
        repo.upsert(Warehouse::new("A", 10).unwrap()).unwrap();
        repo.upsert(Warehouse::new("B", 20).unwrap()).unwrap();

        let all = repo.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].location(), "B");
        assert_eq!(all[0].capacity_limit(), 20);
    }

    #[test]
    fn sum_at_counts_every_status() {
        let repo = InMemoryLotRepository::new();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut reserved = InventoryLot::new(UserId::new(), "Rice", 30, "kg", "Mwea", at).unwrap();
        reserved.reserve(at).unwrap();
        repo.insert(reserved).unwrap();
        repo.insert(InventoryLot::new(UserId::new(), "Rice", 12, "kg", "Mwea", at).unwrap())
            .unwrap();
        repo.insert(InventoryLot::new(UserId::new(), "Rice", 99, "kg", "Elsewhere", at).unwrap())
            .unwrap();

        assert_eq!(repo.sum_at("Mwea").unwrap(), 42);
    }

    #[test]
    fn duplicate_lot_insert_conflicts() {
        let repo = InMemoryLotRepository::new();
        let lot = InventoryLot::new(UserId::new(), "Rice", 1, "kg", "Mwea", Utc::now()).unwrap();
        repo.insert(lot.clone()).unwrap();
        assert!(matches!(repo.insert(lot), Err(RepositoryError::Conflict(_))));
    }

    #[test]
    fn stale_order_save_conflicts() {
        let repo = InMemoryOrderRepository::new();
        let id = OrderId::new();
        let mut order = VendorOrder::empty(id);
        let events = order
            .handle(&VendorOrderCommand::PlaceOrder(PlaceOrder {
                order_id: id,
                vendor: UserId::new(),
                item_name: "Rice".into(),
                quantity: 5,
                unit: "kg".into(),
                warehouse_location: "Mwea".into(),
                vendor_location: "Embu".into(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order.apply(&events[0]);

        repo.save(order.clone(), ExpectedVersion::Exact(0)).unwrap();
        let err = repo.save(order, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn stale_delivery_save_conflicts() {
        let repo = InMemoryDeliveryRepository::new();
        let delivery = Delivery::new(
            "Rice",
            5,
            "kg",
            farmlink_orders::Stop::new("Mwea"),
            farmlink_orders::Stop::new("Embu"),
            Utc::now(),
        )
        .unwrap();
        repo.save(delivery.clone(), ExpectedVersion::Exact(0)).unwrap();

        let mut first = repo.get(delivery.id_typed()).unwrap().unwrap();
        let mut second = first.clone();
        first.mark_received_by_warehouse(Utc::now()).unwrap();
        second.mark_received_by_warehouse(Utc::now()).unwrap();

        repo.save(first, ExpectedVersion::Exact(0)).unwrap();
        let err = repo.save(second, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.get(delivery.id_typed()).unwrap().unwrap().version(), 1);
    }

    #[test]
    fn directory_resolves_roles() {
        let dir = InMemoryUserDirectory::new();
        let admin = UserId::new();
        let manager = UserId::new();
        dir.register(Principal::new(admin, Role::Admin)).unwrap();
        dir.register(Principal::new(manager, Role::WarehouseManager).with_location("Mwea"))
            .unwrap();

        assert_eq!(dir.find_admin().unwrap(), Some(admin));
        assert_eq!(dir.manager_at("Mwea").unwrap(), Some(manager));
        assert_eq!(dir.manager_at("Embu").unwrap(), None);
    }
}
