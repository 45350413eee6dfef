//! Orders domain module (placement and fulfilment).
//!
//! This crate contains the business rules for customer orders: placement with
//! frozen line prices, the fulfilment state machine, and the cancellation
//! window, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod order;

pub use order::{Order, OrderItem, OrderStatus};
