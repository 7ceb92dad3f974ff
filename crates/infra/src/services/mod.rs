//! Application services over the repositories.
//!
//! Every service that reads then writes a location's stock does so inside that
//! location's lock (see [`crate::locks::LocationLocks`]).

pub mod bridge;
pub mod capacity;
pub mod orders;
pub mod owner;
pub mod reservation;
pub mod selector;
pub mod utilization;

pub use bridge::{
    DeliveryInventoryBridge, DispatchOutcome, FarmerConsumption, ManualAdjustment, ManualOp,
    OptimalReceipt, ReceiveOutcome,
};
pub use capacity::CapacityLedger;
pub use orders::{DeliveredOrder, FulfilledOrder, OrderWorkflow, PlaceOrderRequest, PlacedOrder};
pub use owner::{OwnerResolver, OwnerSource, ResolvedOwner};
pub use reservation::{CommitOutcome, ReservationManager};
pub use selector::WarehouseSelector;
pub use utilization::UtilizationTracker;
