use tracing::debug;

use farmlink_core::{DomainError, UserId};

use crate::error::ServiceResult;
use crate::repository::{UserDirectory, WarehouseRepository};

/// Where a resolved inventory owner came from, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSource {
    /// The warehouse record's linked manager.
    WarehouseManager,
    /// A manager whose own location is the warehouse location.
    LocationManager,
    Admin,
    /// The transporter who delivered the goods.
    Transporter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub owner: UserId,
    pub source: OwnerSource,
}

/// Resolves who owns goods received into a warehouse. First match wins.
#[derive(Debug, Clone)]
pub struct OwnerResolver<W, U> {
    warehouses: W,
    users: U,
}

impl<W, U> OwnerResolver<W, U>
where
    W: WarehouseRepository,
    U: UserDirectory,
{
    pub fn new(warehouses: W, users: U) -> Self {
        Self { warehouses, users }
    }

    pub fn resolve(&self, location: &str, transporter: Option<UserId>) -> ServiceResult<ResolvedOwner> {
        let linked = self.warehouses.get(location)?.and_then(|w| w.manager());

        let candidates = [
            (OwnerSource::WarehouseManager, linked),
            (OwnerSource::LocationManager, self.users.manager_at(location)?),
            (OwnerSource::Admin, self.users.find_admin()?),
            (OwnerSource::Transporter, transporter),
        ];

        let resolved = candidates
            .into_iter()
            .find_map(|(source, owner)| owner.map(|owner| ResolvedOwner { owner, source }))
            .ok_or_else(|| {
                DomainError::not_found(format!("no inventory owner resolvable for '{location}'"))
            })?;

        debug!(location, owner = %resolved.owner, source = ?resolved.source, "inventory owner resolved");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use farmlink_auth::{Principal, Role};
    use farmlink_warehouse::Warehouse;

    use crate::repository::{InMemoryUserDirectory, InMemoryWarehouseRepository};

    fn resolver() -> (
        OwnerResolver<Arc<InMemoryWarehouseRepository>, Arc<InMemoryUserDirectory>>,
        Arc<InMemoryWarehouseRepository>,
        Arc<InMemoryUserDirectory>,
    ) {
        let warehouses = Arc::new(InMemoryWarehouseRepository::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        (OwnerResolver::new(warehouses.clone(), users.clone()), warehouses, users)
    }

    #[test]
    fn fallback_order_is_linked_manager_then_located_manager_then_admin_then_transporter() {
        let (resolver, warehouses, users) = resolver();
        let transporter = UserId::new();

        let got = resolver.resolve("Machakos", Some(transporter)).unwrap();
        assert_eq!((got.owner, got.source), (transporter, OwnerSource::Transporter));

        let admin = UserId::new();
        users.register(Principal::new(admin, Role::Admin)).unwrap();
        let got = resolver.resolve("Machakos", Some(transporter)).unwrap();
        assert_eq!((got.owner, got.source), (admin, OwnerSource::Admin));

        let located = UserId::new();
        users
            .register(Principal::new(located, Role::WarehouseManager).with_location("Machakos"))
            .unwrap();
        let got = resolver.resolve("Machakos", Some(transporter)).unwrap();
        assert_eq!((got.owner, got.source), (located, OwnerSource::LocationManager));

        let linked = UserId::new();
        warehouses
            .upsert(Warehouse::new("Machakos", 500).unwrap().with_manager(linked))
            .unwrap();
        let got = resolver.resolve("Machakos", Some(transporter)).unwrap();
        assert_eq!((got.owner, got.source), (linked, OwnerSource::WarehouseManager));
    }

    #[test]
    fn nobody_to_own_is_not_found() {
        let (resolver, _, _) = resolver();
        assert!(resolver.resolve("Machakos", None).unwrap_err().is_not_found());
    }
}
