//! `farmlink-core` — domain foundation building blocks.
//!
//! Identifiers, the domain error model, aggregate/entity traits and the geographic
//! primitives used to score warehouses. Pure domain code: no IO, no storage.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod geo;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use geo::{GeoPoint, distance_km, proximity_score};
pub use id::{DeliveryId, LotId, OrderId, UserId};
