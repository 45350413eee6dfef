use serde::{Deserialize, Serialize};

use fairmarket_core::ValueObject;

use crate::seller::KycStatus;

/// Seller trust score: an integer in `0..=100`.
///
/// Construction clamps, so a `TrustScore` never holds an out-of-range value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustScore(u8);

impl TrustScore {
    /// Starting score for a freshly registered seller.
    pub const NEUTRAL: TrustScore = TrustScore(50);

    pub const MIN: TrustScore = TrustScore(0);
    pub const MAX: TrustScore = TrustScore(100);

    /// Clamp an integral value into range.
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX.0))
    }

    /// Round a raw weighted sum half-up to an integer and clamp into range.
    pub fn from_raw(raw: f64) -> Self {
        let rounded = (raw + 0.5).floor();
        Self(rounded.clamp(0.0, 100.0) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl ValueObject for TrustScore {}

impl core::fmt::Display for TrustScore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Read-only snapshot of the behavioral signals feeding a seller's score.
///
/// Assembled by the orchestrator from stored records; the calculator itself
/// never performs IO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustSignals {
    /// Seller-level KYC verification state.
    pub kyc_status: KycStatus,
    /// Distinct delivered orders containing at least one of the seller's
    /// products.
    pub delivered_orders: u64,
    /// Mean review rating across the seller's products that have at least one
    /// review, or `None` when nothing has been reviewed yet.
    pub avg_product_rating: Option<f64>,
    /// Count of the seller's products currently flagged suspicious.
    pub suspicious_products: u32,
}

impl TrustSignals {
    /// Signals of a seller with no history: unverified, no sales, no reviews,
    /// no flags. Scores exactly [`TrustScore::NEUTRAL`].
    pub fn empty() -> Self {
        Self {
            kyc_status: KycStatus::NotSubmitted,
            delivered_orders: 0,
            avg_product_rating: None,
            suspicious_products: 0,
        }
    }
}

/// Weights of the additive trust model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Starting point of every score.
    pub base: f64,
    /// Added when the KYC chain is approved.
    pub kyc_approved_bonus: f64,
    /// Subtracted when the KYC chain is rejected.
    pub kyc_rejected_penalty: f64,
    /// Delivered orders required per point of the sales-volume term.
    pub orders_per_point: f64,
    /// Cap on the sales-volume term.
    pub orders_term_cap: f64,
    /// Average rating at which the rating term is zero.
    pub rating_neutral: f64,
    /// Points per star of distance from the neutral rating.
    pub rating_points_per_star: f64,
    /// Symmetric cap on the rating term.
    pub rating_term_cap: f64,
    /// Penalty per suspiciously priced product.
    pub suspicious_penalty: f64,
    /// Cap on the total price-integrity penalty.
    pub suspicious_term_cap: f64,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            base: 50.0,
            kyc_approved_bonus: 30.0,
            kyc_rejected_penalty: 20.0,
            orders_per_point: 10.0,
            orders_term_cap: 20.0,
            rating_neutral: 3.0,
            rating_points_per_star: 10.0,
            rating_term_cap: 15.0,
            suspicious_penalty: 10.0,
            suspicious_term_cap: 30.0,
        }
    }
}

/// Derive a seller's trust score from a signals snapshot.
///
/// Pure and deterministic: identical signals always yield the identical
/// score, so recomputation is idempotent and order-independent.
pub fn compute_trust_score(signals: &TrustSignals, policy: &TrustPolicy) -> TrustScore {
    let mut raw = policy.base;

    raw += match signals.kyc_status {
        KycStatus::Approved => policy.kyc_approved_bonus,
        KycStatus::Rejected => -policy.kyc_rejected_penalty,
        KycStatus::NotSubmitted | KycStatus::Pending => 0.0,
    };

    // Sales-volume term: fractional, capped.
    raw += (signals.delivered_orders as f64 / policy.orders_per_point).min(policy.orders_term_cap);

    // Rating term centers on the neutral rating; an unreviewed catalog
    // contributes nothing rather than a penalty.
    if let Some(avg) = signals.avg_product_rating {
        raw += ((avg - policy.rating_neutral) * policy.rating_points_per_star)
            .clamp(-policy.rating_term_cap, policy.rating_term_cap);
    }

    raw -= (f64::from(signals.suspicious_products) * policy.suspicious_penalty)
        .min(policy.suspicious_term_cap);

    TrustScore::from_raw(raw)
}
