//! Read models returned by the engine's query and decision operations.

use serde::{Deserialize, Serialize};

use fairmarket_catalog::PriceFlag;
use fairmarket_core::{ProductId, SellerId};
use fairmarket_sellers::{KycStatus, Seller, SellerStatus, TrustScore};

/// Point-in-time view of a seller's verification and trust state, returned
/// after operations that may have moved any of these fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSnapshot {
    pub seller_id: SellerId,
    pub trust_score: TrustScore,
    pub status: SellerStatus,
    pub kyc_status: KycStatus,
    pub verified: bool,
}

impl From<&Seller> for SellerSnapshot {
    fn from(seller: &Seller) -> Self {
        Self {
            seller_id: seller.id_typed(),
            trust_score: seller.trust_score(),
            status: seller.status(),
            kyc_status: seller.kyc_status(),
            verified: seller.verified(),
        }
    }
}

/// The trust read model: score plus the status it currently implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerTrust {
    pub seller_id: SellerId,
    pub score: TrustScore,
    pub status: SellerStatus,
}

/// The price-integrity read model of one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPriceFlag {
    pub product_id: ProductId,
    pub flag: PriceFlag,
    /// The category reference price at the last classification, when one
    /// existed.
    pub recommended_price: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshots_serialize_to_flat_transport_payloads() {
        let seller_id = SellerId::new();
        let trust = SellerTrust {
            seller_id,
            score: TrustScore::new(72),
            status: SellerStatus::Active,
        };
        assert_eq!(
            serde_json::to_value(trust).unwrap(),
            json!({
                "seller_id": seller_id.to_string(),
                "score": 72,
                "status": "active",
            })
        );

        let product_id = ProductId::new();
        let flag = ProductPriceFlag {
            product_id,
            flag: PriceFlag::Overpriced,
            recommended_price: Some(100_000),
        };
        assert_eq!(
            serde_json::to_value(flag).unwrap(),
            json!({
                "product_id": product_id.to_string(),
                "flag": "overpriced",
                "recommended_price": 100_000,
            })
        );
    }
}
