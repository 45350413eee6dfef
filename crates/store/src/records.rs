use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fairmarket_catalog::Product;
use fairmarket_core::{
    Entity, ExpectedVersion, OrderId, ProductId, ReviewId, SellerId, SubmissionId,
};
use fairmarket_orders::Order;
use fairmarket_reviews::Review;
use fairmarket_sellers::{KycSubmission, Seller};

/// Record store operation error.
///
/// These are **infrastructure errors** (concurrency, lookup plumbing,
/// availability) as opposed to domain errors (validation, invariants).
///
/// - **Conflict**: an optimistic version check failed, or a batch was
///   malformed (two writes for the same record). The caller re-reads and
///   retries.
/// - **NotFound**: a query the store itself cannot answer (reserved for
///   backends with referential lookups; plain lookups return `Ok(None)`).
/// - **Unavailable**: the backend cannot serve the request at all.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One write of a transactional batch: the full new state of a record.
///
/// The store persists whole records, never field-level patches, so a write
/// is just the record to keep plus its kind tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordWrite {
    Seller(Seller),
    Product(Product),
    KycSubmission(KycSubmission),
    Review(Review),
    Order(Order),
}

impl RecordWrite {
    pub fn kind(&self) -> &'static str {
        match self {
            RecordWrite::Seller(_) => "seller",
            RecordWrite::Product(_) => "product",
            RecordWrite::KycSubmission(_) => "kyc_submission",
            RecordWrite::Review(_) => "review",
            RecordWrite::Order(_) => "order",
        }
    }

    pub fn record_id(&self) -> Uuid {
        match self {
            RecordWrite::Seller(r) => *r.id_typed().as_uuid(),
            RecordWrite::Product(r) => *r.id_typed().as_uuid(),
            RecordWrite::KycSubmission(r) => *r.id_typed().as_uuid(),
            RecordWrite::Review(r) => *r.id_typed().as_uuid(),
            RecordWrite::Order(r) => *r.id_typed().as_uuid(),
        }
    }

    /// The storage version this record was read at (0 when never persisted).
    pub fn version(&self) -> u64 {
        match self {
            RecordWrite::Seller(r) => r.version(),
            RecordWrite::Product(r) => r.version(),
            RecordWrite::KycSubmission(r) => r.version(),
            RecordWrite::Review(r) => r.version(),
            RecordWrite::Order(r) => r.version(),
        }
    }

    /// Stable key for duplicate detection within a batch.
    pub(crate) fn key(&self) -> (&'static str, Uuid) {
        (self.kind(), self.record_id())
    }
}

impl From<Seller> for RecordWrite {
    fn from(record: Seller) -> Self {
        RecordWrite::Seller(record)
    }
}

impl From<Product> for RecordWrite {
    fn from(record: Product) -> Self {
        RecordWrite::Product(record)
    }
}

impl From<KycSubmission> for RecordWrite {
    fn from(record: KycSubmission) -> Self {
        RecordWrite::KycSubmission(record)
    }
}

impl From<Review> for RecordWrite {
    fn from(record: Review) -> Self {
        RecordWrite::Review(record)
    }
}

impl From<Order> for RecordWrite {
    fn from(record: Order) -> Self {
        RecordWrite::Order(record)
    }
}

/// All-or-nothing batch of record writes.
///
/// Every write carries a version expectation; commit validates every
/// expectation before applying anything, so a conflict on any record leaves
/// the whole batch unapplied.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    writes: Vec<(RecordWrite, ExpectedVersion)>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write expecting the version the record was read at (0 for a
    /// record that has never been persisted). This is the normal optimistic
    /// path.
    pub fn put(&mut self, write: impl Into<RecordWrite>) -> &mut Self {
        let write = write.into();
        let expected = ExpectedVersion::Exact(write.version());
        self.put_with(write, expected)
    }

    /// Queue a write with an explicit expectation. `ExpectedVersion::Any`
    /// upserts unconditionally (last write wins).
    pub fn put_with(
        &mut self,
        write: impl Into<RecordWrite>,
        expected: ExpectedVersion,
    ) -> &mut Self {
        self.writes.push((write.into(), expected));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[(RecordWrite, ExpectedVersion)] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<(RecordWrite, ExpectedVersion)> {
        self.writes
    }
}

/// Storage contract of the trust and price-integrity engine.
///
/// ## Design principles
///
/// - **No storage assumptions**: works with the in-memory implementation
///   (tests/dev) and future SQL backends (production).
/// - **Optimistic locking**: every record carries a store-managed `version`;
///   commits expect the version the record was read at and bump it by one.
///   No pessimistic locks.
/// - **Whole-record writes**: the engine reads records, mutates them through
///   their domain methods, and hands the new state back.
/// - **Derived state stays out**: trust scores, price flags, and aggregates
///   are computed by the engine; the store only answers lookups and applies
///   batches.
///
/// ## Commit semantics
///
/// `commit()` validates every version expectation in the batch, then applies
/// every write, atomically: a conflict on any record applies nothing.
/// An empty transaction is a no-op.
///
/// ## Query semantics
///
/// Point lookups return `Ok(None)` for missing records (absence is a value,
/// not a failure). Multi-record queries return results in a stable order
/// (ascending record id, which for UUIDv7 keys tracks creation time).
pub trait RecordStore: Send + Sync {
    fn seller(&self, id: SellerId) -> StoreResult<Option<Seller>>;

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    fn kyc_submission(&self, id: SubmissionId) -> StoreResult<Option<KycSubmission>>;

    fn review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    fn order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Latest submission for a seller by submission time: the current one of
    /// the chain, or `None` when the seller has never submitted.
    fn current_kyc_submission(&self, seller_id: SellerId) -> StoreResult<Option<KycSubmission>>;

    fn products_by_seller(&self, seller_id: SellerId) -> StoreResult<Vec<Product>>;

    /// Active listings in a category; the classifier's reference sample.
    fn active_products_in_category(&self, category: &str) -> StoreResult<Vec<Product>>;

    fn reviews_for_product(&self, product_id: ProductId) -> StoreResult<Vec<Review>>;

    /// Orders containing at least one line for the product.
    fn orders_for_product(&self, product_id: ProductId) -> StoreResult<Vec<Order>>;

    /// Orders containing at least one line from the seller.
    fn orders_for_seller(&self, seller_id: SellerId) -> StoreResult<Vec<Order>>;

    /// Apply a batch of writes atomically under optimistic concurrency.
    fn commit(&self, transaction: Transaction) -> StoreResult<()>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn seller(&self, id: SellerId) -> StoreResult<Option<Seller>> {
        (**self).seller(id)
    }

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).product(id)
    }

    fn kyc_submission(&self, id: SubmissionId) -> StoreResult<Option<KycSubmission>> {
        (**self).kyc_submission(id)
    }

    fn review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        (**self).review(id)
    }

    fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        (**self).order(id)
    }

    fn current_kyc_submission(&self, seller_id: SellerId) -> StoreResult<Option<KycSubmission>> {
        (**self).current_kyc_submission(seller_id)
    }

    fn products_by_seller(&self, seller_id: SellerId) -> StoreResult<Vec<Product>> {
        (**self).products_by_seller(seller_id)
    }

    fn active_products_in_category(&self, category: &str) -> StoreResult<Vec<Product>> {
        (**self).active_products_in_category(category)
    }

    fn reviews_for_product(&self, product_id: ProductId) -> StoreResult<Vec<Review>> {
        (**self).reviews_for_product(product_id)
    }

    fn orders_for_product(&self, product_id: ProductId) -> StoreResult<Vec<Order>> {
        (**self).orders_for_product(product_id)
    }

    fn orders_for_seller(&self, seller_id: SellerId) -> StoreResult<Vec<Order>> {
        (**self).orders_for_seller(seller_id)
    }

    fn commit(&self, transaction: Transaction) -> StoreResult<()> {
        (**self).commit(transaction)
    }
}
