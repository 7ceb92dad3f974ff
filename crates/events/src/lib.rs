//! Domain events and their distribution.
//!
//! Domain crates describe what happened as `Event` values; infrastructure fans them out
//! to subscribers (notification delivery, reporting) through an `EventBus`.

pub mod bus;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
