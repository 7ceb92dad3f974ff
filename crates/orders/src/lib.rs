//! Orders domain module.
//!
//! The vendor order aggregate (commands, events, state machine) and the delivery record
//! the inventory bridge reads and writes at the receipt/dispatch boundary.

pub mod delivery;
pub mod order;

pub use delivery::{Delivery, DeliveryStatus, Stop};
pub use order::{
    ApproveOrder, CancelOrder, FulfillOrder, LotsReserved, MarkOrderDelivered, OrderApproved,
    OrderCancelled, OrderDelivered, OrderFulfilled, OrderPlaced, OrderRejected, OrderStatus,
    PlaceOrder, RecordReservations, RejectOrder, VendorOrder, VendorOrderCommand,
    VendorOrderEvent,
};
