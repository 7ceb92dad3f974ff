//! Inventory domain module.
//!
//! Quantity-bearing lots, keyword category classification, FIFO consumption planning,
//! whole-lot reservation primitives and the threshold alerts raised when stock moves.
//! Deterministic domain logic only (no IO, no storage).

pub mod alerts;
pub mod category;
pub mod fifo;
pub mod lot;
pub mod reservation;

pub use alerts::{AlertThresholds, LowStock, StockAlert, WarehouseNearCapacity};
pub use category::Category;
pub use fifo::{ConsumptionPlan, ConsumptionStep, LotMutation, fifo_sort, plan_fifo};
pub use lot::{Committed, InventoryLot, LotNote, LotStatus};
pub use reservation::{Reservation, ReservationPlan, commit_reservation, release_reservation, reserve_lots};
