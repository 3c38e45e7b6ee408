//! Entity trait: records with identity that survive field patches.

/// Entity marker + minimal interface.
///
/// Roles, permission rows, businesses and employee profiles are all entities:
/// two records with the same id are the same record, whatever their fields.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
