//! Catalog domain module (product listings and price integrity).
//!
//! This crate contains the business rules for product listings: the Product
//! entity, the severity-ordered price flag, and the category reference-price
//! classifier, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod pricing;
pub mod product;

pub use pricing::{assess, classify, reference_price, PriceAssessment, PricePolicy};
pub use product::{PriceFlag, Product};
