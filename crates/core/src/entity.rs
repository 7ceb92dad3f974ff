//! Entity trait: identity + continuity across state changes.

/// A record with a stable identity.
///
/// The in-memory stores key lots and deliveries by `Entity::id`, and find warehouses
/// by it (the location).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
