//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. They represent
/// concepts where identity doesn't matter - only the values do. To "modify"
/// one, construct a new one; construction is where range/shape invariants are
/// enforced, so a value object can never hold an illegal value.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: no identity (same values ⇒ equal)
/// - **Entity**: has identity (same ID ⇒ same entity)
///
/// Example:
/// - `TrustScore(82)` is a value object (clamped to 0..=100 on construction)
/// - `Seller { id: SellerId(...), .. }` is an entity
///
/// The trait requires:
/// - **Clone**: values are cheap to copy
/// - **PartialEq**: compared by attribute values
/// - **Debug**: debuggable (logging, testing)
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
