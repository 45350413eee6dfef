//! Optimistic-concurrency version expectations.

/// Optimistic concurrency expectation for a record write.
///
/// A write that expects `Exact(v)` only commits if the stored record is still
/// at version `v` (0 for a record that does not exist yet). `Any` skips the
/// check (useful for idempotent rebuilds and migrations).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
