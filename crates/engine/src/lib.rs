//! Trust and price-integrity engine.
//!
//! The orchestration layer of the marketplace: it loads records through the
//! store contract, applies the domain crates' rules in dependency order
//! (price flags feed trust, trust feeds status), and commits every related
//! change as one atomic batch. Transports (HTTP handlers, job runners,
//! admin tooling) call [`Engine`] operations and never touch the store
//! directly for writes.

pub mod commands;
pub mod engine;
pub mod error;
pub mod policy;
pub mod snapshots;
pub mod sweep;

pub use commands::{
    CreateProduct, OrderLine, PlaceOrder, PostReview, RegisterSeller, UpdateSellerProfile,
};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use policy::EnginePolicy;
pub use snapshots::{ProductPriceFlag, SellerSnapshot, SellerTrust};
pub use sweep::{CategorySweep, SweepFailure};
