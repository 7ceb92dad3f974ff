use farmlink_warehouse::{Utilization, Warehouse};

use crate::error::ServiceResult;
use crate::repository::{LotRepository, WarehouseRepository};

/// Occupancy recomputed from the lots at a location.
///
/// This sum, not the cached `current_capacity` counter, is what admission decisions
/// (selection, manual adds, optimal receipt) are based on.
#[derive(Debug, Clone)]
pub struct UtilizationTracker<W, L> {
    warehouses: W,
    lots: L,
}

impl<W, L> UtilizationTracker<W, L>
where
    W: WarehouseRepository,
    L: LotRepository,
{
    pub fn new(warehouses: W, lots: L) -> Self {
        Self { warehouses, lots }
    }

    /// `None` when no warehouse is registered at `location`.
    pub fn utilization(&self, location: &str) -> ServiceResult<Option<Utilization>> {
        match self.warehouses.get(location)? {
            Some(w) => Ok(Some(self.utilization_of(&w)?)),
            None => Ok(None),
        }
    }

    pub fn utilization_of(&self, warehouse: &Warehouse) -> ServiceResult<Utilization> {
        let stock = self.lots.sum_at(warehouse.location())?;
        Ok(Utilization::compute(
            warehouse.location(),
            warehouse.capacity_limit(),
            stock,
        ))
    }

    pub(crate) fn warehouses(&self) -> &W {
        &self.warehouses
    }
}
