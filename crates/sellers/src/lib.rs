//! Sellers domain module (accounts, KYC verification, trust scoring).
//!
//! This crate contains the business rules for seller accounts: the identity
//! verification workflow, the policy-driven account status machine, and the
//! trust score calculator, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod kyc;
pub mod seller;
pub mod trust;

pub use kyc::{
    IdDocumentType, KycDocumentRefs, KycOutcome, KycSubmission, SubmissionStatus,
};
pub use seller::{
    evaluate_status, KycStatus, Seller, SellerStatus, StatusPolicy,
};
pub use trust::{compute_trust_score, TrustPolicy, TrustScore, TrustSignals};
