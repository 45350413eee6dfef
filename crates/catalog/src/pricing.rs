use serde::{Deserialize, Serialize};

use fairmarket_core::{DomainError, DomainResult};

use crate::product::PriceFlag;

/// Thresholds of the price flag classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePolicy {
    /// Minimum number of active products a category needs before a reference
    /// price exists.
    pub min_category_sample: usize,
    /// Prices below this fraction of the reference are flagged suspicious
    /// regardless of the bands.
    pub underprice_ratio: f64,
    /// Upper bound (inclusive) of the fair band, as price/reference.
    pub fair_max_ratio: f64,
    /// Upper bound (inclusive) of the overpriced band, as price/reference.
    pub overpriced_max_ratio: f64,
}

impl Default for PricePolicy {
    fn default() -> Self {
        Self {
            min_category_sample: 3,
            underprice_ratio: 0.2,
            fair_max_ratio: 1.3,
            overpriced_max_ratio: 2.0,
        }
    }
}

/// Outcome of assessing one listing against its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAssessment {
    pub flag: PriceFlag,
    pub recommended_price: Option<u64>,
}

impl PriceAssessment {
    /// The degraded assessment used when a category has no reference price:
    /// unflagged, no recommendation.
    pub fn unclassified() -> Self {
        Self {
            flag: PriceFlag::None,
            recommended_price: None,
        }
    }
}

/// Median listed price of a category's active products.
///
/// The median rather than the mean keeps a single wildly priced listing from
/// dragging the whole category's reference. An even-sized sample takes the
/// mean of the two middle prices, truncated to the minor unit. Fails with
/// `InsufficientData` below the minimum sample size.
pub fn reference_price(prices: &[u64], policy: &PricePolicy) -> DomainResult<u64> {
    if prices.len() < policy.min_category_sample {
        return Err(DomainError::insufficient_data(format!(
            "category has {} active products, need at least {}",
            prices.len(),
            policy.min_category_sample
        )));
    }

    let mut sorted = prices.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        let (lo, hi) = (sorted[mid - 1], sorted[mid]);
        lo + (hi - lo) / 2
    };
    Ok(median)
}

/// Classify a price against the category reference.
///
/// The implausibly-cheap override runs before the bands: a listing far below
/// the reference reads as a counterfeit or scam signal, not a bargain.
pub fn classify(price: u64, reference: u64, policy: &PricePolicy) -> PriceFlag {
    let ratio = price as f64 / reference as f64;
    if ratio < policy.underprice_ratio {
        return PriceFlag::Suspicious;
    }
    if ratio <= policy.fair_max_ratio {
        PriceFlag::Fair
    } else if ratio <= policy.overpriced_max_ratio {
        PriceFlag::Overpriced
    } else {
        PriceFlag::Suspicious
    }
}

/// Assess a listing against an optional category reference, degrading to the
/// unclassified assessment when the category cannot produce one.
///
/// The recommended price, when present, is always the reference itself.
pub fn assess(price: u64, reference: Option<u64>, policy: &PricePolicy) -> PriceAssessment {
    match reference {
        Some(reference) => PriceAssessment {
            flag: classify(price, reference, policy),
            recommended_price: Some(reference),
        },
        None => PriceAssessment::unclassified(),
    }
}
