use tracing::{debug, instrument};

use farmlink_core::{DomainError, GeoPoint};
use farmlink_warehouse::{Candidate, ScoringPolicy, rank_candidates};

use crate::error::ServiceResult;
use crate::repository::{LotRepository, WarehouseRepository};
use crate::services::UtilizationTracker;

/// Picks the warehouse for a pending quantity.
#[derive(Debug, Clone)]
pub struct WarehouseSelector<W, L> {
    tracker: UtilizationTracker<W, L>,
    policy: ScoringPolicy,
}

impl<W, L> WarehouseSelector<W, L>
where
    W: WarehouseRepository,
    L: LotRepository,
{
    pub fn new(tracker: UtilizationTracker<W, L>, policy: ScoringPolicy) -> Self {
        Self { tracker, policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Every warehouse with room for `requested`, best first.
    pub fn rank(
        &self,
        origin: Option<&GeoPoint>,
        requested: i64,
        preferred_location: Option<&str>,
    ) -> ServiceResult<Vec<Candidate>> {
        if requested <= 0 {
            return Err(DomainError::validation("requested quantity must be positive").into());
        }

        let mut inputs = Vec::new();
        for warehouse in self.tracker.warehouses().list()? {
            if warehouse.capacity_limit() <= 0 {
                continue;
            }
            let utilization = self.tracker.utilization_of(&warehouse)?;
            inputs.push((warehouse, utilization));
        }

        let ranked = rank_candidates(&self.policy, origin, requested, preferred_location, inputs);
        for c in &ranked {
            debug!(
                location = %c.location(),
                distance_km = c.distance_km,
                proximity = c.scores.proximity,
                capacity = c.scores.capacity,
                utilization = c.scores.utilization,
                preference = c.scores.preference,
                total = c.scores.total,
                "scored warehouse candidate"
            );
        }
        Ok(ranked)
    }

    /// The top-ranked candidate with its score breakdown, or `None` when no warehouse
    /// has `requested` units of free space.
    #[instrument(skip(self, origin))]
    pub fn find_optimal_warehouse(
        &self,
        origin: Option<&GeoPoint>,
        requested: i64,
        preferred_location: Option<&str>,
    ) -> ServiceResult<Option<Candidate>> {
        let best = self
            .rank(origin, requested, preferred_location)?
            .into_iter()
            .next();
        match &best {
            Some(c) => debug!(location = %c.location(), total = c.scores.total, "selected warehouse"),
            None => debug!("no warehouse has room"),
        }
        Ok(best)
    }
}
