//! Delivery of threshold alerts to external subscribers.
//!
//! This core never notifies anyone itself; it hands `StockAlert`s to an `AlertSink`.
//! Alert delivery is best-effort: a failed publish is logged and never rolls back the
//! stock movement that raised it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use farmlink_events::{Event, EventBus};
use farmlink_inventory::{AlertThresholds, InventoryLot, LowStock, StockAlert, WarehouseNearCapacity};
use farmlink_warehouse::Utilization;

pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: StockAlert);
}

impl<S> AlertSink for Arc<S>
where
    S: AlertSink + ?Sized,
{
    fn emit(&self, alert: StockAlert) {
        (**self).emit(alert)
    }
}

/// Discards every alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn emit(&self, alert: StockAlert) {
        debug!(event_type = alert.event_type(), "alert discarded");
    }
}

/// Writes each alert to the log as a JSON payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl TracingAlertSink {
    pub fn render(alert: &StockAlert) -> Result<String, serde_json::Error> {
        serde_json::to_string(alert)
    }
}

impl AlertSink for TracingAlertSink {
    fn emit(&self, alert: StockAlert) {
        match Self::render(&alert) {
            Ok(payload) => warn!(
                event_type = alert.event_type(),
                location = %alert.location(),
                %payload,
                "stock alert"
            ),
            Err(err) => warn!(event_type = alert.event_type(), error = %err, "stock alert not serializable"),
        }
    }
}

/// Publishes alerts on an event bus (`onLowStock` / `onWarehouseNearCapacity` subscribers).
#[derive(Debug, Clone)]
pub struct BusAlertSink<B> {
    bus: B,
}

impl<B> BusAlertSink<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> AlertSink for BusAlertSink<B>
where
    B: EventBus<StockAlert>,
{
    fn emit(&self, alert: StockAlert) {
        let event_type = alert.event_type();
        let location = alert.location().to_string();
        if let Err(err) = self.bus.publish(alert) {
            warn!(event_type, location = %location, error = ?err, "failed to publish stock alert");
        }
    }
}

/// Threshold checks bound to a sink.
#[derive(Debug, Clone)]
pub struct Alerting<A> {
    sink: A,
    thresholds: AlertThresholds,
}

impl<A: AlertSink> Alerting<A> {
    pub fn new(sink: A, thresholds: AlertThresholds) -> Self {
        Self { sink, thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Raise `LowStock` when `lot` just dropped below the threshold.
    pub fn lot_quantity_changed(&self, lot: &InventoryLot, before: i64) {
        if !self.thresholds.low_stock_crossed(before, lot.quantity()) {
            return;
        }
        self.sink.emit(StockAlert::LowStock(LowStock {
            lot_id: lot.id_typed(),
            location: lot.location().to_string(),
            item_name: lot.item_name().to_string(),
            quantity: lot.quantity(),
            threshold: self.thresholds.low_stock_threshold,
            occurred_at: Utc::now(),
        }));
    }

    /// Raise `WarehouseNearCapacity` when utilization just reached the threshold.
    pub fn utilization_changed(&self, before: &Utilization, after: &Utilization) {
        if !self
            .thresholds
            .near_capacity_crossed(before.utilization_rate, after.utilization_rate)
        {
            return;
        }
        self.sink.emit(StockAlert::WarehouseNearCapacity(WarehouseNearCapacity {
            location: after.location.clone(),
            utilization_rate: after.utilization_rate,
            current_stock: after.current_stock,
            capacity_limit: after.capacity_limit,
            threshold_rate: self.thresholds.near_capacity_rate,
            occurred_at: Utc::now(),
        }));
    }
}
