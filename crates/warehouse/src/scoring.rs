//! Multi-factor warehouse ranking.
//!
//! total = proximity (0–40) + capacity headroom (0–30) + utilization band (5/10/20)
//!       + preferred-location bonus (0/10)
//!
//! Candidates without enough free space for the requested quantity are dropped before
//! scoring. Ranking is a stable descending sort, so the earlier warehouse in input
//! order wins ties.

use serde::{Deserialize, Serialize};

use farmlink_core::geo::{self, GeoPoint};

use crate::{Utilization, Warehouse};

/// Tunable constants of the ranking function. Defaults reproduce the platform's
/// published scoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub max_proximity_points: f64,
    pub points_lost_per_km: f64,
    pub max_capacity_points: f64,
    /// Warehouses below this utilization rate get `underused_points`.
    pub underused_below_rate: f64,
    /// Warehouses above this utilization rate get `overused_points`.
    pub overused_above_rate: f64,
    pub underused_points: f64,
    pub overused_points: f64,
    pub operating_band_points: f64,
    pub preferred_location_points: f64,
    /// Drop warehouses that have no coordinates instead of scoring them 0 proximity.
    pub require_coordinates: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            max_proximity_points: geo::MAX_PROXIMITY_POINTS,
            points_lost_per_km: geo::PROXIMITY_POINTS_PER_KM,
            max_capacity_points: 30.0,
            underused_below_rate: 20.0,
            overused_above_rate: 90.0,
            underused_points: 10.0,
            overused_points: 5.0,
            operating_band_points: 20.0,
            preferred_location_points: 10.0,
            require_coordinates: false,
        }
    }
}

impl ScoringPolicy {
    pub fn proximity_points(&self, distance_km: f64) -> f64 {
        geo::proximity_score_with(distance_km, self.max_proximity_points, self.points_lost_per_km)
    }

    pub fn capacity_points(&self, utilization: &Utilization) -> f64 {
        if utilization.capacity_limit <= 0 {
            return 0.0;
        }
        let headroom = utilization.free_space as f64 / utilization.capacity_limit as f64;
        (headroom * self.max_capacity_points).min(self.max_capacity_points)
    }

    pub fn utilization_points(&self, utilization_rate: f64) -> f64 {
        if utilization_rate < self.underused_below_rate {
            self.underused_points
        } else if utilization_rate > self.overused_above_rate {
            self.overused_points
        } else {
            self.operating_band_points
        }
    }

    pub fn score(
        &self,
        distance_km: f64,
        utilization: &Utilization,
        is_preferred: bool,
    ) -> ScoreBreakdown {
        let proximity = self.proximity_points(distance_km);
        let capacity = self.capacity_points(utilization);
        let utilization = self.utilization_points(utilization.utilization_rate);
        let preference = if is_preferred {
            self.preferred_location_points
        } else {
            0.0
        };

        ScoreBreakdown {
            proximity,
            capacity,
            utilization,
            preference,
            total: proximity + capacity + utilization + preference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub proximity: f64,
    pub capacity: f64,
    pub utilization: f64,
    pub preference: f64,
    pub total: f64,
}

/// A warehouse that survived the free-space filter, with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub warehouse: Warehouse,
    pub utilization: Utilization,
    pub distance_km: f64,
    pub scores: ScoreBreakdown,
}

impl Candidate {
    pub fn location(&self) -> &str {
        self.warehouse.location()
    }
}

/// Score and rank warehouses for `requested` units arriving from `origin`.
///
/// Returns every surviving candidate, best first.
pub fn rank_candidates<I>(
    policy: &ScoringPolicy,
    origin: Option<&GeoPoint>,
    requested: i64,
    preferred_location: Option<&str>,
    warehouses: I,
) -> Vec<Candidate>
where
    I: IntoIterator<Item = (Warehouse, Utilization)>,
{
    let mut candidates: Vec<Candidate> = warehouses
        .into_iter()
        .filter(|(w, _)| w.capacity_limit() > 0)
        .filter(|(w, _)| !policy.require_coordinates || w.coordinates().is_some())
        .filter(|(_, u)| u.can_accept(requested))
        .map(|(warehouse, utilization)| {
            let distance_km = geo::distance_km(origin, warehouse.coordinates());
            let is_preferred = preferred_location == Some(warehouse.location());
            let scores = policy.score(distance_km, &utilization, is_preferred);
            Candidate {
                warehouse,
                utilization,
                distance_km,
                scores,
            }
        })
        .collect();

    // `sort_by` is stable: equal totals keep input order.
    candidates.sort_by(|a, b| {
        b.scores
            .total
            .partial_cmp(&a.scores.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn stocked(location: &str, limit: i64, used: i64, coords: Option<GeoPoint>) -> (Warehouse, Utilization) {
        let mut w = Warehouse::new(location, limit).unwrap().with_current_capacity(used);
        if let Some(c) = coords {
            w = w.with_coordinates(c);
        }
        let u = Utilization::compute(location, limit, used);
        (w, u)
    }

    /// Roughly `km` kilometres north of the equator origin.
    fn km_north(km: f64) -> GeoPoint {
        point(km / 111.195, 0.0)
    }

    #[test]
    fn warehouse_without_room_is_never_scored() {
        let origin = point(0.0, 0.0);
        let ranked = rank_candidates(
            &ScoringPolicy::default(),
            Some(&origin),
            300,
            None,
            vec![
                stocked("X", 1000, 400, Some(origin)),
                stocked("Y", 1000, 900, Some(origin)),
            ],
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].location(), "X");
        // 40 proximity + 18 headroom (600/1000·30) + 20 band.
        assert!((ranked[0].scores.total - 78.0).abs() < 1e-9);
    }

    #[test]
    fn closer_warehouse_wins_when_everything_else_ties() {
        let origin = point(0.0, 0.0);
        let ranked = rank_candidates(
            &ScoringPolicy::default(),
            Some(&origin),
            100,
            None,
            vec![
                stocked("Far", 1000, 500, Some(km_north(50.0))),
                stocked("Near", 1000, 500, Some(km_north(5.0))),
            ],
        );

        assert_eq!(ranked[0].location(), "Near");
        assert!((ranked[0].scores.proximity - 30.0).abs() < 0.01);
        assert_eq!(ranked[1].scores.proximity, 0.0);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_candidates(
            &ScoringPolicy::default(),
            None,
            10,
            None,
            vec![
                stocked("First", 500, 250, None),
                stocked("Second", 500, 250, None),
            ],
        );
        assert_eq!(ranked[0].location(), "First");
        assert_eq!(ranked[0].scores.total, ranked[1].scores.total);
    }

    #[test]
    fn utilization_band_points() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.utilization_points(5.0), 10.0);
        assert_eq!(policy.utilization_points(20.0), 20.0);
        assert_eq!(policy.utilization_points(90.0), 20.0);
        assert_eq!(policy.utilization_points(90.01), 5.0);
    }

    #[test]
    fn preferred_location_gets_bonus() {
        let ranked = rank_candidates(
            &ScoringPolicy::default(),
            None,
            10,
            Some("Second"),
            vec![
                stocked("First", 500, 250, None),
                stocked("Second", 500, 250, None),
            ],
        );
        assert_eq!(ranked[0].location(), "Second");
        assert_eq!(ranked[0].scores.preference, 10.0);
    }

    #[test]
    fn missing_coordinates_score_zero_proximity_unless_required() {
        let origin = point(0.0, 0.0);
        let inputs = || vec![stocked("Unmapped", 1000, 500, None)];

        let lenient = rank_candidates(&ScoringPolicy::default(), Some(&origin), 10, None, inputs());
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].scores.proximity, 0.0);
        assert!(lenient[0].distance_km.is_infinite());

        let strict = ScoringPolicy {
            require_coordinates: true,
            ..ScoringPolicy::default()
        };
        assert!(rank_candidates(&strict, Some(&origin), 10, None, inputs()).is_empty());
    }

    #[test]
    fn no_survivors_yields_empty_ranking() {
        let ranked = rank_candidates(
            &ScoringPolicy::default(),
            None,
            2000,
            None,
            vec![stocked("Small", 1000, 0, None)],
        );
        assert!(ranked.is_empty());
    }

    proptest! {
        /// Property: no ranked candidate ever lacks room for the request.
        #[test]
        fn ranked_candidates_always_have_room(
            stock in prop::collection::vec((1i64..2000, 0i64..2500), 1..12),
            requested in 0i64..2000,
        ) {
            let inputs: Vec<_> = stock
                .iter()
                .enumerate()
                .map(|(i, (limit, used))| stocked(&format!("W{i}"), *limit, *used, None))
                .collect();
            let ranked = rank_candidates(&ScoringPolicy::default(), None, requested, None, inputs);
            for c in &ranked {
                prop_assert!(c.utilization.free_space >= requested);
            }
        }

        /// Property: with identical stock, the closer warehouse never scores lower.
        #[test]
        fn closer_never_scores_lower(
            near_km in 0.0f64..60.0,
            extra_km in 0.0f64..60.0,
            limit in 1i64..5000,
            used_pct in 0i64..100,
        ) {
            let used = limit * used_pct / 100;
            let origin = point(0.0, 0.0);
            let ranked = rank_candidates(
                &ScoringPolicy::default(),
                Some(&origin),
                0,
                None,
                vec![
                    stocked("Far", limit, used, Some(km_north(near_km + extra_km))),
                    stocked("Near", limit, used, Some(km_north(near_km))),
                ],
            );
            let near = ranked.iter().find(|c| c.location() == "Near").unwrap();
            let far = ranked.iter().find(|c| c.location() == "Far").unwrap();
            prop_assert!(near.scores.total >= far.scores.total);
        }
    }
}
