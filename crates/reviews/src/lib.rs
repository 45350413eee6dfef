//! Reviews domain module.
//!
//! Customer reviews with validated star ratings, plus the rating summary
//! the engine feeds into product aggregates. Pure domain logic only: no IO,
//! no HTTP, no persistence concerns.

pub mod review;

pub use review::{summarize_ratings, Rating, RatingSummary, Review};
