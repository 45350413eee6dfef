use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fairmarket_core::{DomainError, DomainResult, Entity, ProductId, SellerId};

use crate::pricing::PriceAssessment;

/// Price-integrity flag on a listing, ordered by severity.
///
/// `None` means the product has not been classified, usually because its
/// category is too thin to produce a reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceFlag {
    None,
    Fair,
    Overpriced,
    Suspicious,
}

impl PriceFlag {
    pub fn is_suspicious(self) -> bool {
        self == PriceFlag::Suspicious
    }
}

impl core::fmt::Display for PriceFlag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            PriceFlag::None => "none",
            PriceFlag::Fair => "fair",
            PriceFlag::Overpriced => "overpriced",
            PriceFlag::Suspicious => "suspicious",
        };
        f.write_str(s)
    }
}

/// Product listing.
///
/// Prices are integer minor currency units. The aggregate fields
/// (`avg_rating`, `review_count`, `sold_count`) and the pricing fields
/// (`price_flag`, `recommended_price`) are derived state owned by the
/// engine; sellers never set them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    seller_id: SellerId,
    name: String,
    description: String,
    category: String,
    price: u64,
    original_price: Option<u64>,
    recommended_price: Option<u64>,
    price_flag: PriceFlag,
    active: bool,
    stock: u32,
    avg_rating: f64,
    review_count: u64,
    sold_count: u64,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Product {
    /// Create a new listing.
    ///
    /// Starts unclassified; the engine assesses the price immediately after
    /// persisting the record.
    #[allow(clippy::too_many_arguments)]
    pub fn list(
        id: ProductId,
        seller_id: SellerId,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        price: u64,
        original_price: Option<u64>,
        stock: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        let category = category.into();
        if category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(Self {
            id,
            seller_id,
            name,
            description: description.into(),
            category,
            price,
            original_price,
            recommended_price: None,
            price_flag: PriceFlag::None,
            active: true,
            stock,
            avg_rating: 0.0,
            review_count: 0,
            sold_count: 0,
            created_at: now,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn original_price(&self) -> Option<u64> {
        self.original_price
    }

    pub fn recommended_price(&self) -> Option<u64> {
        self.recommended_price
    }

    pub fn price_flag(&self) -> PriceFlag {
        self.price_flag
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn avg_rating(&self) -> f64 {
        self.avg_rating
    }

    pub fn review_count(&self) -> u64 {
        self.review_count
    }

    pub fn sold_count(&self) -> u64 {
        self.sold_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_reviews(&self) -> bool {
        self.review_count > 0
    }

    /// Change the listed price. The flag is stale until the engine
    /// re-assesses it.
    pub fn change_price(&mut self, new_price: u64) -> DomainResult<()> {
        if new_price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        self.price = new_price;
        Ok(())
    }

    /// Move the listing to another category.
    pub fn change_category(&mut self, new_category: impl Into<String>) -> DomainResult<()> {
        let new_category = new_category.into();
        if new_category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        self.category = new_category;
        Ok(())
    }

    /// Activate or deactivate the listing. Inactive products drop out of
    /// category reference pricing.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Apply a price assessment computed against the category reference.
    pub fn apply_assessment(&mut self, assessment: PriceAssessment) {
        self.price_flag = assessment.flag;
        self.recommended_price = assessment.recommended_price;
    }

    /// Engine-owned: overwrite the review aggregates.
    pub fn record_review_aggregates(&mut self, avg_rating: f64, review_count: u64) {
        self.avg_rating = avg_rating;
        self.review_count = review_count;
    }

    /// Engine-owned: overwrite the delivered-units counter.
    pub fn record_sold_count(&mut self, sold_count: u64) {
        self.sold_count = sold_count;
    }

    /// Reserve stock for an order line. Insufficient stock is a conflict.
    pub fn reserve_stock(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.stock < quantity {
            return Err(DomainError::conflict(format!(
                "insufficient stock: {} requested, {} available",
                quantity, self.stock
            )));
        }
        self.stock -= quantity;
        Ok(())
    }

    /// Return previously reserved stock, e.g. when an order is cancelled.
    pub fn restore_stock(&mut self, quantity: u32) {
        self.stock = self.stock.saturating_add(quantity);
    }

    /// Copy stamped with the storage version assigned by the record store on
    /// commit.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
