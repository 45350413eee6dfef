use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fairmarket_core::{DomainError, DomainResult, Entity, SellerId, UserId};

use crate::kyc::KycOutcome;
use crate::trust::TrustScore;

/// Seller account status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellerStatus {
    /// Registered but not yet cleared to sell.
    Pending,
    /// Cleared to sell.
    Active,
    /// Listings hidden pending trust recovery.
    Frozen,
    /// Terminal; never left once entered.
    Banned,
}

impl core::fmt::Display for SellerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            SellerStatus::Pending => "pending",
            SellerStatus::Active => "active",
            SellerStatus::Frozen => "frozen",
            SellerStatus::Banned => "banned",
        };
        f.write_str(s)
    }
}

/// Seller-level KYC verification state, derived from the submission chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

/// Thresholds driving automatic status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPolicy {
    /// Minimum trust score for activation, and for recovery from a freeze.
    pub activation_min: u8,
    /// An active seller whose score falls strictly below this is frozen.
    pub freeze_below: u8,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            activation_min: 40,
            freeze_below: 20,
        }
    }
}

/// Policy-driven status re-evaluation: the pure transition table.
///
/// Returns the transition to apply, or `None` when the current status stands.
/// At most one transition results from a single evaluation, and evaluating
/// again with the same inputs yields `None`. The gap between `freeze_below`
/// and `activation_min` is a deliberate hysteresis band: a frozen seller at
/// 25 stays frozen, an active seller at 25 stays active.
pub fn evaluate_status(
    current: SellerStatus,
    kyc_status: KycStatus,
    score: TrustScore,
    policy: &StatusPolicy,
) -> Option<SellerStatus> {
    match current {
        SellerStatus::Pending
            if kyc_status == KycStatus::Approved && score.value() >= policy.activation_min =>
        {
            Some(SellerStatus::Active)
        }
        SellerStatus::Active if score.value() < policy.freeze_below => Some(SellerStatus::Frozen),
        SellerStatus::Frozen if score.value() >= policy.activation_min => {
            Some(SellerStatus::Active)
        }
        // Banned is terminal; anything else holds its status.
        _ => None,
    }
}

/// Seller profile: marketplace identity plus verification and trust state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    id: SellerId,
    user_id: UserId,
    business_name: String,
    description: String,
    logo_url: Option<String>,
    category: String,
    verified: bool,
    trust_score: TrustScore,
    status: SellerStatus,
    kyc_status: KycStatus,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Seller {
    /// Register a new seller profile for a user.
    ///
    /// New sellers start at the neutral trust score, in `Pending` status,
    /// unverified, with no KYC submission on file.
    pub fn register(
        id: SellerId,
        user_id: UserId,
        business_name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let business_name = business_name.into();
        if business_name.trim().is_empty() {
            return Err(DomainError::validation("business_name cannot be empty"));
        }
        let category = category.into();
        if category.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }

        Ok(Self {
            id,
            user_id,
            business_name,
            description: description.into(),
            logo_url: None,
            category,
            verified: false,
            trust_score: TrustScore::NEUTRAL,
            status: SellerStatus::Pending,
            kyc_status: KycStatus::NotSubmitted,
            created_at: now,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> SellerId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn business_name(&self) -> &str {
        &self.business_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn logo_url(&self) -> Option<&str> {
        self.logo_url.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn trust_score(&self) -> TrustScore {
        self.trust_score
    }

    pub fn status(&self) -> SellerStatus {
        self.status
    }

    pub fn kyc_status(&self) -> KycStatus {
        self.kyc_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Invariant helper: whether this seller's listings are visible and
    /// purchasable.
    ///
    /// Only active sellers can sell; frozen and banned sellers cannot.
    pub fn can_sell(&self) -> bool {
        self.status == SellerStatus::Active
    }

    pub fn update_profile(
        &mut self,
        business_name: Option<String>,
        description: Option<String>,
        logo_url: Option<String>,
    ) -> DomainResult<()> {
        if let Some(name) = business_name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("business_name cannot be empty"));
            }
            self.business_name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(url) = logo_url {
            self.logo_url = Some(url);
        }
        Ok(())
    }

    /// Move the seller-level KYC state to `Pending` when a submission is
    /// filed.
    ///
    /// Guards the filing preconditions: one pending submission at a time, an
    /// approved chain is final, and banned sellers cannot re-enter review.
    pub fn begin_kyc_review(&mut self) -> DomainResult<()> {
        if self.status == SellerStatus::Banned {
            return Err(DomainError::invalid_state(
                "banned sellers cannot submit kyc documents",
            ));
        }
        match self.kyc_status {
            KycStatus::Pending => Err(DomainError::conflict(
                "a kyc submission is already pending review",
            )),
            KycStatus::Approved => Err(DomainError::invalid_state("kyc is already approved")),
            KycStatus::NotSubmitted | KycStatus::Rejected => {
                self.kyc_status = KycStatus::Pending;
                Ok(())
            }
        }
    }

    /// Record the outcome of a KYC review.
    ///
    /// `verified` stays consistent with the chain: true exactly when the
    /// latest decision approved it.
    pub fn record_kyc_outcome(&mut self, outcome: KycOutcome) -> DomainResult<()> {
        if self.kyc_status != KycStatus::Pending {
            return Err(DomainError::invalid_state(
                "no kyc submission is awaiting a decision",
            ));
        }
        match outcome {
            KycOutcome::Approved => {
                self.kyc_status = KycStatus::Approved;
                self.verified = true;
            }
            KycOutcome::Rejected => {
                self.kyc_status = KycStatus::Rejected;
                self.verified = false;
            }
        }
        Ok(())
    }

    /// Overwrite the trust score with a freshly computed value.
    pub fn record_trust_score(&mut self, score: TrustScore) {
        self.trust_score = score;
    }

    /// Apply a status transition, enforcing the legal edge set.
    ///
    /// Legal edges: pending -> active (KYC approved only), active -> frozen,
    /// frozen -> active, and any non-banned status -> banned. Everything
    /// else, including any edge out of banned, is rejected.
    pub fn transition_status(&mut self, next: SellerStatus) -> DomainResult<()> {
        let legal = match (self.status, next) {
            (SellerStatus::Pending, SellerStatus::Active) => {
                self.kyc_status == KycStatus::Approved
            }
            (SellerStatus::Active, SellerStatus::Frozen) => true,
            (SellerStatus::Frozen, SellerStatus::Active) => true,
            (from, SellerStatus::Banned) => from != SellerStatus::Banned,
            _ => false,
        };
        if !legal {
            return Err(DomainError::invalid_state(format!(
                "illegal status transition: {} -> {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Re-evaluate the status against policy and apply at most one
    /// transition.
    ///
    /// Returns the transition applied, if any. Idempotent: a second call with
    /// unchanged trust and KYC state returns `Ok(None)`.
    pub fn reevaluate_status(
        &mut self,
        policy: &StatusPolicy,
    ) -> DomainResult<Option<SellerStatus>> {
        match evaluate_status(self.status, self.kyc_status, self.trust_score, policy) {
            Some(next) => {
                self.transition_status(next)?;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    /// Administrative ban. Terminal, and never applied by policy evaluation.
    pub fn ban(&mut self) -> DomainResult<()> {
        self.transition_status(SellerStatus::Banned)
    }

    /// Copy stamped with the storage version assigned by the record store on
    /// commit.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

impl Entity for Seller {
    type Id = SellerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seller() -> Seller {
        Seller::register(
            SellerId::new(),
            UserId::new(),
            "Lagos Leatherworks",
            "Handmade leather goods",
            "fashion",
            Utc::now(),
        )
        .unwrap()
    }

    fn approved_seller() -> Seller {
        let mut seller = test_seller();
        seller.begin_kyc_review().unwrap();
        seller.record_kyc_outcome(KycOutcome::Approved).unwrap();
        seller
    }

    fn active_seller() -> Seller {
        let mut seller = approved_seller();
        seller.transition_status(SellerStatus::Active).unwrap();
        seller
    }

    #[test]
    fn register_starts_pending_unverified_at_neutral_trust() {
        let seller = test_seller();
        assert_eq!(seller.status(), SellerStatus::Pending);
        assert_eq!(seller.kyc_status(), KycStatus::NotSubmitted);
        assert_eq!(seller.trust_score(), TrustScore::NEUTRAL);
        assert!(!seller.verified());
        assert!(!seller.can_sell());
        assert_eq!(seller.version(), 0);
    }

    #[test]
    fn register_rejects_blank_business_name() {
        let err = Seller::register(
            SellerId::new(),
            UserId::new(),
            "   ",
            "",
            "fashion",
            Utc::now(),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn begin_kyc_review_moves_chain_to_pending() {
        let mut seller = test_seller();
        seller.begin_kyc_review().unwrap();
        assert_eq!(seller.kyc_status(), KycStatus::Pending);
    }

    #[test]
    fn begin_kyc_review_rejects_duplicate_pending_submission() {
        let mut seller = test_seller();
        seller.begin_kyc_review().unwrap();
        let err = seller.begin_kyc_review().unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            other => panic!("expected Conflict error, got {other:?}"),
        }
    }

    #[test]
    fn begin_kyc_review_allows_resubmission_after_rejection() {
        let mut seller = test_seller();
        seller.begin_kyc_review().unwrap();
        seller.record_kyc_outcome(KycOutcome::Rejected).unwrap();
        assert_eq!(seller.kyc_status(), KycStatus::Rejected);

        seller.begin_kyc_review().unwrap();
        assert_eq!(seller.kyc_status(), KycStatus::Pending);
    }

    #[test]
    fn begin_kyc_review_rejects_approved_chain() {
        let mut seller = approved_seller();
        let err = seller.begin_kyc_review().unwrap_err();
        match err {
            DomainError::InvalidState(_) => {}
            other => panic!("expected InvalidState error, got {other:?}"),
        }
    }

    #[test]
    fn begin_kyc_review_rejects_banned_seller() {
        let mut seller = test_seller();
        seller.ban().unwrap();
        let err = seller.begin_kyc_review().unwrap_err();
        match err {
            DomainError::InvalidState(_) => {}
            other => panic!("expected InvalidState error, got {other:?}"),
        }
    }

    #[test]
    fn kyc_approval_marks_seller_verified() {
        let seller = approved_seller();
        assert_eq!(seller.kyc_status(), KycStatus::Approved);
        assert!(seller.verified());
    }

    #[test]
    fn kyc_rejection_leaves_seller_unverified() {
        let mut seller = test_seller();
        seller.begin_kyc_review().unwrap();
        seller.record_kyc_outcome(KycOutcome::Rejected).unwrap();
        assert!(!seller.verified());
    }

    #[test]
    fn record_kyc_outcome_requires_a_pending_chain() {
        let mut seller = test_seller();
        let err = seller.record_kyc_outcome(KycOutcome::Approved).unwrap_err();
        match err {
            DomainError::InvalidState(_) => {}
            other => panic!("expected InvalidState error, got {other:?}"),
        }
    }

    #[test]
    fn evaluate_status_activates_pending_seller_only_with_approval_and_score() {
        let policy = StatusPolicy::default();
        let eval = |kyc: KycStatus, score: u8| {
            evaluate_status(SellerStatus::Pending, kyc, TrustScore::new(score), &policy)
        };

        assert_eq!(eval(KycStatus::Approved, 40), Some(SellerStatus::Active));
        assert_eq!(eval(KycStatus::Approved, 100), Some(SellerStatus::Active));
        // Score threshold is inclusive; 39 misses it.
        assert_eq!(eval(KycStatus::Approved, 39), None);
        // Approval alone is not enough without the score, and vice versa.
        assert_eq!(eval(KycStatus::Pending, 90), None);
        assert_eq!(eval(KycStatus::Rejected, 90), None);
        assert_eq!(eval(KycStatus::NotSubmitted, 90), None);
    }

    #[test]
    fn evaluate_status_freezes_active_seller_below_twenty() {
        let policy = StatusPolicy::default();
        let eval = |score: u8| {
            evaluate_status(
                SellerStatus::Active,
                KycStatus::Approved,
                TrustScore::new(score),
                &policy,
            )
        };

        assert_eq!(eval(19), Some(SellerStatus::Frozen));
        assert_eq!(eval(0), Some(SellerStatus::Frozen));
        // Boundary: exactly 20 stays active.
        assert_eq!(eval(20), None);
        assert_eq!(eval(100), None);
    }

    #[test]
    fn evaluate_status_thaws_frozen_seller_at_forty() {
        let policy = StatusPolicy::default();
        let eval = |score: u8| {
            evaluate_status(
                SellerStatus::Frozen,
                KycStatus::Approved,
                TrustScore::new(score),
                &policy,
            )
        };

        assert_eq!(eval(40), Some(SellerStatus::Active));
        assert_eq!(eval(100), Some(SellerStatus::Active));
        assert_eq!(eval(39), None);
        assert_eq!(eval(0), None);
    }

    #[test]
    fn evaluate_status_hysteresis_band_holds_both_states() {
        // Between the freeze and activation thresholds neither direction
        // fires, so a score of 25 keeps active sellers active and frozen
        // sellers frozen.
        let policy = StatusPolicy::default();
        let score = TrustScore::new(25);
        assert_eq!(
            evaluate_status(SellerStatus::Active, KycStatus::Approved, score, &policy),
            None
        );
        assert_eq!(
            evaluate_status(SellerStatus::Frozen, KycStatus::Approved, score, &policy),
            None
        );
    }

    #[test]
    fn evaluate_status_never_leaves_banned() {
        let policy = StatusPolicy::default();
        for score in [0u8, 19, 25, 40, 100] {
            assert_eq!(
                evaluate_status(
                    SellerStatus::Banned,
                    KycStatus::Approved,
                    TrustScore::new(score),
                    &policy,
                ),
                None
            );
        }
    }

    #[test]
    fn evaluate_status_is_idempotent_after_applying_the_transition() {
        let policy = StatusPolicy::default();
        let score = TrustScore::new(45);
        let next =
            evaluate_status(SellerStatus::Frozen, KycStatus::Approved, score, &policy).unwrap();
        assert_eq!(next, SellerStatus::Active);
        assert_eq!(
            evaluate_status(next, KycStatus::Approved, score, &policy),
            None
        );
    }

    #[test]
    fn reevaluate_status_applies_the_policy_transition() {
        let mut seller = approved_seller();
        seller.record_trust_score(TrustScore::new(80));
        let applied = seller.reevaluate_status(&StatusPolicy::default()).unwrap();
        assert_eq!(applied, Some(SellerStatus::Active));
        assert!(seller.can_sell());

        // Second evaluation with unchanged inputs is a no-op.
        let applied = seller.reevaluate_status(&StatusPolicy::default()).unwrap();
        assert_eq!(applied, None);
    }

    #[test]
    fn reevaluate_status_freezes_and_thaws_on_trust_drift() {
        let mut seller = active_seller();

        seller.record_trust_score(TrustScore::new(15));
        assert_eq!(
            seller.reevaluate_status(&StatusPolicy::default()).unwrap(),
            Some(SellerStatus::Frozen)
        );
        assert!(!seller.can_sell());

        // Recovery within the hysteresis band is not enough.
        seller.record_trust_score(TrustScore::new(30));
        assert_eq!(
            seller.reevaluate_status(&StatusPolicy::default()).unwrap(),
            None
        );
        assert_eq!(seller.status(), SellerStatus::Frozen);

        seller.record_trust_score(TrustScore::new(45));
        assert_eq!(
            seller.reevaluate_status(&StatusPolicy::default()).unwrap(),
            Some(SellerStatus::Active)
        );
        assert!(seller.can_sell());
    }

    #[test]
    fn transition_status_rejects_activation_without_approved_kyc() {
        let mut seller = test_seller();
        let err = seller.transition_status(SellerStatus::Active).unwrap_err();
        match err {
            DomainError::InvalidState(_) => {}
            other => panic!("expected InvalidState error, got {other:?}"),
        }
    }

    #[test]
    fn transition_status_rejects_edges_outside_the_table() {
        let mut seller = test_seller();
        assert!(seller.transition_status(SellerStatus::Frozen).is_err());

        let mut seller = active_seller();
        assert!(seller.transition_status(SellerStatus::Pending).is_err());

        let mut frozen = active_seller();
        frozen.transition_status(SellerStatus::Frozen).unwrap();
        assert!(frozen.transition_status(SellerStatus::Pending).is_err());
    }

    #[test]
    fn ban_is_reachable_from_every_non_banned_status_and_terminal() {
        for make in [test_seller, approved_seller, active_seller] {
            let mut seller = make();
            seller.ban().unwrap();
            assert_eq!(seller.status(), SellerStatus::Banned);
        }

        let mut frozen = active_seller();
        frozen.transition_status(SellerStatus::Frozen).unwrap();
        frozen.ban().unwrap();
        assert_eq!(frozen.status(), SellerStatus::Banned);

        let mut banned = test_seller();
        banned.ban().unwrap();
        assert!(banned.ban().is_err());
        assert!(banned.transition_status(SellerStatus::Active).is_err());
        assert!(banned.transition_status(SellerStatus::Pending).is_err());
        assert!(banned.transition_status(SellerStatus::Frozen).is_err());
    }

    #[test]
    fn update_profile_keeps_unspecified_fields() {
        let mut seller = test_seller();
        seller
            .update_profile(None, Some("New description".to_string()), None)
            .unwrap();
        assert_eq!(seller.business_name(), "Lagos Leatherworks");
        assert_eq!(seller.description(), "New description");
        assert_eq!(seller.logo_url(), None);

        seller
            .update_profile(None, None, Some("https://cdn.example/logo.png".to_string()))
            .unwrap();
        assert_eq!(seller.logo_url(), Some("https://cdn.example/logo.png"));
    }

    #[test]
    fn update_profile_rejects_blank_business_name() {
        let mut seller = test_seller();
        let err = seller
            .update_profile(Some(" ".to_string()), None, None)
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn with_version_stamps_the_storage_version() {
        let seller = test_seller().with_version(7);
        assert_eq!(seller.version(), 7);
    }
}
