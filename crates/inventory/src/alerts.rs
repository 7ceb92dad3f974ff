//! Threshold alerts raised as stock moves.
//!
//! Alerts fire on crossing only: a lot that is already low does not re-alert on every
//! further decrement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use farmlink_core::LotId;
use farmlink_events::Event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// A lot whose quantity drops below this many units is low on stock.
    pub low_stock_threshold: i64,
    /// Utilization percentage at or above which a warehouse is near capacity.
    pub near_capacity_rate: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low_stock_threshold: 10,
            near_capacity_rate: 90.0,
        }
    }
}

impl AlertThresholds {
    pub fn low_stock_crossed(&self, before: i64, after: i64) -> bool {
        before >= self.low_stock_threshold && after < self.low_stock_threshold
    }

    pub fn near_capacity_crossed(&self, before_rate: f64, after_rate: f64) -> bool {
        before_rate < self.near_capacity_rate && after_rate >= self.near_capacity_rate
    }
}

/// Event: LowStock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStock {
    pub lot_id: LotId,
    pub location: String,
    pub item_name: String,
    pub quantity: i64,
    pub threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WarehouseNearCapacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseNearCapacity {
    pub location: String,
    pub utilization_rate: f64,
    pub current_stock: i64,
    pub capacity_limit: i64,
    pub threshold_rate: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockAlert {
    LowStock(LowStock),
    WarehouseNearCapacity(WarehouseNearCapacity),
}

impl StockAlert {
    pub fn location(&self) -> &str {
        match self {
            StockAlert::LowStock(e) => &e.location,
            StockAlert::WarehouseNearCapacity(e) => &e.location,
        }
    }
}

impl Event for StockAlert {
    fn event_type(&self) -> &'static str {
        match self {
            StockAlert::LowStock(_) => "inventory.lot.low_stock",
            StockAlert::WarehouseNearCapacity(_) => "inventory.warehouse.near_capacity",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockAlert::LowStock(e) => e.occurred_at,
            StockAlert::WarehouseNearCapacity(e) => e.occurred_at,
        }
    }
}
