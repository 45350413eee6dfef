//! Record store: the storage contract of the engine, plus the in-memory
//! implementation used by tests and development.
//!
//! The engine reads whole records, mutates them through their domain
//! methods, and commits them back in all-or-nothing [`Transaction`] batches
//! under optimistic concurrency. Backends implement [`RecordStore`]; nothing
//! in this crate assumes a particular storage technology.

pub mod memory;
pub mod records;

pub use memory::MemoryStore;
pub use records::{RecordStore, RecordWrite, StoreError, StoreResult, Transaction};
