//! `fairmarket-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId, ReviewId, SellerId, SubmissionId, UserId};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
