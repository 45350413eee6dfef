//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Entities are stored as current-state records. `version()` is the
/// optimistic-concurrency token checked by the record store on commit:
/// 0 means "not yet persisted"; the store bumps it on every successful write.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Version of the record as last read from (or 0 if never written to)
    /// the store.
    fn version(&self) -> u64;
}
