//! Great-circle distance and proximity scoring.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Proximity points awarded at zero distance.
pub const MAX_PROXIMITY_POINTS: f64 = 40.0;

/// Proximity points lost per kilometre of distance.
pub const PROXIMITY_POINTS_PER_KM: f64 = 2.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting coordinates outside the valid degree ranges.
    pub fn new(latitude: f64, longitude: f64) -> DomainResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::validation(format!(
                "latitude {latitude} out of range [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::validation(format!(
                "longitude {longitude} out of range [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Haversine distance to `other` in kilometres.
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lon1) = (self.latitude.to_radians(), self.longitude.to_radians());
        let (lat2, lon2) = (other.latitude.to_radians(), other.longitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

/// Distance between two optional points.
///
/// Returns `f64::INFINITY` when either side has no coordinates: "no proximity
/// information" rather than an error.
pub fn distance_km(a: Option<&GeoPoint>, b: Option<&GeoPoint>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => a.haversine_km(b),
        _ => f64::INFINITY,
    }
}

/// `max(0, 40 - 2·d)`: 40 points at the origin, 0 from 20 km on.
pub fn proximity_score(distance_km: f64) -> f64 {
    proximity_score_with(distance_km, MAX_PROXIMITY_POINTS, PROXIMITY_POINTS_PER_KM)
}

/// Linear proximity decay with configurable ceiling and slope.
pub fn proximity_score_with(distance_km: f64, max_points: f64, points_per_km: f64) -> f64 {
    if distance_km.is_nan() {
        return 0.0;
    }
    (max_points - points_per_km * distance_km).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_between_identical_points_is_zero() {
        let p = GeoPoint::new(-1.2921, 36.8219).unwrap();
        assert!(p.haversine_km(&p).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 0.0).unwrap();
        let d = a.haversine_km(&b);
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn missing_coordinates_mean_infinite_distance_and_zero_score() {
        let a = GeoPoint::new(10.0, 10.0).unwrap();
        let d = distance_km(Some(&a), None);
        assert!(d.is_infinite());
        assert_eq!(proximity_score(d), 0.0);
        assert!(distance_km(None, None).is_infinite());
    }

    #[test]
    fn proximity_score_decays_linearly_and_clips() {
        assert_eq!(proximity_score(0.0), 40.0);
        assert_eq!(proximity_score(5.0), 30.0);
        assert_eq!(proximity_score(20.0), 0.0);
        assert_eq!(proximity_score(50.0), 0.0);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(matches!(
            GeoPoint::new(91.0, 0.0),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, -180.5),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        /// Property: the score never increases as distance grows.
        #[test]
        fn proximity_score_is_non_increasing(a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(proximity_score(near) >= proximity_score(far));
        }

        #[test]
        fn haversine_is_symmetric(
            lat1 in -90.0f64..90.0, lon1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lon2 in -180.0f64..180.0,
        ) {
            let a = GeoPoint::new(lat1, lon1).unwrap();
            let b = GeoPoint::new(lat2, lon2).unwrap();
            prop_assert!((a.haversine_km(&b) - b.haversine_km(&a)).abs() < 1e-6);
        }
    }
}
