use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fairmarket_core::{
    DomainError, DomainResult, Entity, ProductId, ReviewId, UserId, ValueObject,
};

/// Star rating: an integer in `1..=5`.
///
/// Validated at construction; an out-of-range rating is unrepresentable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> DomainResult<Self> {
        if !(1..=5).contains(&value) {
            return Err(DomainError::validation(format!(
                "rating must be between 1 and 5, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl ValueObject for Rating {}

impl core::fmt::Display for Rating {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Average and count over a set of ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u64,
}

/// Summarize a product's ratings; `None` for an unreviewed product, so a
/// missing signal stays distinct from a zero one.
pub fn summarize_ratings(ratings: &[Rating]) -> Option<RatingSummary> {
    if ratings.is_empty() {
        return None;
    }
    let count = ratings.len() as u64;
    let sum: u64 = ratings.iter().map(|r| u64::from(r.value())).sum();
    Some(RatingSummary {
        average: sum as f64 / count as f64,
        count,
    })
}

/// A customer review of a product.
///
/// Immutable once posted. `verified_purchase` is stamped by the engine when
/// the author has a delivered order containing the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    rating: Rating,
    title: String,
    body: String,
    verified_purchase: bool,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Review {
    pub fn post(
        id: ReviewId,
        product_id: ProductId,
        user_id: UserId,
        rating: Rating,
        title: impl Into<String>,
        body: impl Into<String>,
        verified_purchase: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        Ok(Self {
            id,
            product_id,
            user_id,
            rating,
            title,
            body: body.into(),
            verified_purchase,
            created_at: now,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> ReviewId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn verified_purchase(&self) -> bool {
        self.verified_purchase
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Copy stamped with the storage version assigned by the record store on
    /// commit.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

impl Entity for Review {
    type Id = ReviewId;

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
    use proptest::prelude::*;

    fn test_review(rating: u8) -> Review {
        Review::post(
            ReviewId::new(),
            ProductId::new(),
            UserId::new(),
            Rating::new(rating).unwrap(),
            "Solid product",
            "Arrived on time, works as described.",
            true,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn rating_accepts_one_through_five() {
        for value in 1..=5u8 {
            assert_eq!(Rating::new(value).unwrap().value(), value);
        }
    }

    #[test]
    fn rating_rejects_out_of_range_values() {
        for value in [0u8, 6, 100] {
            let err = Rating::new(value).unwrap_err();
            match err {
                DomainError::Validation(_) => {}
                other => panic!("expected Validation error for {value}, got {other:?}"),
            }
        }
    }

    #[test]
    fn post_keeps_rating_and_verification_stamp() {
        let review = test_review(4);
        assert_eq!(review.rating().value(), 4);
        assert!(review.verified_purchase());
        assert_eq!(review.title(), "Solid product");
        assert_eq!(review.version(), 0);
    }

    #[test]
    fn post_rejects_blank_title() {
        let err = Review::post(
            ReviewId::new(),
            ProductId::new(),
            UserId::new(),
            Rating::new(5).unwrap(),
            "   ",
            "",
            false,
            Utc::now(),
        )
        .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn summarize_ratings_returns_none_for_no_reviews() {
        assert_eq!(summarize_ratings(&[]), None);
    }

    #[test]
    fn summarize_ratings_averages_and_counts() {
        let ratings = [
            Rating::new(5).unwrap(),
            Rating::new(4).unwrap(),
            Rating::new(4).unwrap(),
            Rating::new(2).unwrap(),
        ];
        let summary = summarize_ratings(&ratings).unwrap();
        assert_eq!(summary.count, 4);
        assert!((summary.average - 3.75).abs() < f64::EPSILON);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn summary_average_stays_within_rating_bounds(
            values in proptest::collection::vec(1u8..=5, 1..100),
        ) {
            let ratings: Vec<Rating> = values
                .iter()
                .map(|v| Rating::new(*v).unwrap())
                .collect();
            let summary = summarize_ratings(&ratings).unwrap();
            prop_assert!(summary.average >= 1.0);
            prop_assert!(summary.average <= 5.0);
            prop_assert_eq!(summary.count, values.len() as u64);
        }
    }
}
