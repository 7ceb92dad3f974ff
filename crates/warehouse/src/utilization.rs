//! Occupancy snapshot of a single warehouse.

use serde::Serialize;

/// Occupancy figures for one warehouse, recomputed from its lots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utilization {
    pub location: String,
    pub current_stock: i64,
    pub capacity_limit: i64,
    /// Percentage rounded to two decimals.
    pub utilization_rate: f64,
    pub free_space: i64,
}

impl Utilization {
    pub fn compute(location: impl Into<String>, capacity_limit: i64, current_stock: i64) -> Self {
        let utilization_rate = if capacity_limit > 0 {
            round2(current_stock as f64 / capacity_limit as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            location: location.into(),
            current_stock,
            capacity_limit,
            utilization_rate,
            free_space: (capacity_limit - current_stock).max(0),
        }
    }

    pub fn can_accept(&self, quantity: i64) -> bool {
        self.free_space >= quantity
    }

    /// Utilization after `quantity` more units arrive.
    pub fn after_adding(&self, quantity: i64) -> Utilization {
        Utilization::compute(
            self.location.clone(),
            self.capacity_limit,
            self.current_stock + quantity,
        )
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_rate_and_free_space() {
        let u = Utilization::compute("Thika", 1000, 400);
        assert_eq!(u.utilization_rate, 40.0);
        assert_eq!(u.free_space, 600);
        assert!(u.can_accept(600));
        assert!(!u.can_accept(601));
    }

    #[test]
    fn rate_is_rounded_to_two_decimals() {
        let u = Utilization::compute("Thika", 3, 1);
        assert_eq!(u.utilization_rate, 33.33);
    }

    #[test]
    fn overfull_warehouse_has_zero_free_space() {
        let u = Utilization::compute("Thika", 100, 130);
        assert_eq!(u.free_space, 0);
        assert_eq!(u.utilization_rate, 130.0);
    }

    #[test]
    fn after_adding_projects_the_new_rate() {
        let u = Utilization::compute("Thika", 200, 150).after_adding(40);
        assert_eq!(u.current_stock, 190);
        assert_eq!(u.utilization_rate, 95.0);
    }
}
