//! Input payloads of the engine's mutating operations.
//!
//! These are transport-facing: the HTTP layer deserializes request bodies
//! into them and hands them over unchanged. Identifier and enum parsing
//! happens before this boundary ([`core::str::FromStr`] on the id newtypes
//! and closed enums), so an operation never sees a token it cannot
//! represent.

use serde::{Deserialize, Serialize};

use fairmarket_core::{ProductId, SellerId, UserId};

/// Command: register a seller profile for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSeller {
    pub user_id: UserId,
    pub business_name: String,
    pub description: String,
    pub category: String,
}

/// Command: edit a seller's public profile. `None` fields keep their
/// current values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSellerProfile {
    pub seller_id: SellerId,
    pub business_name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

/// Command: create a product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub seller_id: SellerId,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Minor currency units.
    pub price: u64,
    /// Optional strike-through comparison price, seller-supplied.
    pub original_price: Option<u64>,
    pub stock: u32,
}

/// Command: post a customer review.
///
/// The rating arrives as a raw integer and is validated into a
/// [`fairmarket_reviews::Rating`] by the operation; `verified_purchase` is
/// never accepted from the caller, the engine stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    pub title: String,
    pub body: String,
}

/// One requested line of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Command: place an order.
///
/// Unit prices are never accepted from the caller; the engine freezes the
/// listed price of each product at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: String,
}
