use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fairmarket_catalog::Product;
use fairmarket_core::{Entity, OrderId, ProductId, ReviewId, SellerId, SubmissionId};
use fairmarket_orders::Order;
use fairmarket_reviews::Review;
use fairmarket_sellers::{KycSubmission, Seller};

use crate::records::{RecordStore, RecordWrite, StoreError, StoreResult, Transaction};

#[derive(Debug, Default)]
struct Records {
    sellers: HashMap<SellerId, Seller>,
    products: HashMap<ProductId, Product>,
    kyc_submissions: HashMap<SubmissionId, KycSubmission>,
    reviews: HashMap<ReviewId, Review>,
    orders: HashMap<OrderId, Order>,
}

impl Records {
    fn version_of(&self, write: &RecordWrite) -> u64 {
        match write {
            RecordWrite::Seller(r) => self
                .sellers
                .get(&r.id_typed())
                .map(Seller::version)
                .unwrap_or(0),
            RecordWrite::Product(r) => self
                .products
                .get(&r.id_typed())
                .map(Product::version)
                .unwrap_or(0),
            RecordWrite::KycSubmission(r) => self
                .kyc_submissions
                .get(&r.id_typed())
                .map(KycSubmission::version)
                .unwrap_or(0),
            RecordWrite::Review(r) => self
                .reviews
                .get(&r.id_typed())
                .map(Review::version)
                .unwrap_or(0),
            RecordWrite::Order(r) => self
                .orders
                .get(&r.id_typed())
                .map(Order::version)
                .unwrap_or(0),
        }
    }

    fn apply(&mut self, write: RecordWrite) {
        let next = self.version_of(&write) + 1;
        match write {
            RecordWrite::Seller(r) => {
                self.sellers.insert(r.id_typed(), r.with_version(next));
            }
            RecordWrite::Product(r) => {
                self.products.insert(r.id_typed(), r.with_version(next));
            }
            RecordWrite::KycSubmission(r) => {
                self.kyc_submissions.insert(r.id_typed(), r.with_version(next));
            }
            RecordWrite::Review(r) => {
                self.reviews.insert(r.id_typed(), r.with_version(next));
            }
            RecordWrite::Order(r) => {
                self.orders.insert(r.id_typed(), r.with_version(next));
            }
        }
    }
}

/// In-memory record store.
///
/// Intended for tests/dev. Not optimized for performance: multi-record
/// queries scan.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Records>> {
        self.records
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Records>> {
        self.records
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn seller(&self, id: SellerId) -> StoreResult<Option<Seller>> {
        Ok(self.read()?.sellers.get(&id).cloned())
    }

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    fn kyc_submission(&self, id: SubmissionId) -> StoreResult<Option<KycSubmission>> {
        Ok(self.read()?.kyc_submissions.get(&id).cloned())
    }

    fn review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    fn current_kyc_submission(&self, seller_id: SellerId) -> StoreResult<Option<KycSubmission>> {
        let records = self.read()?;
        Ok(records
            .kyc_submissions
            .values()
            .filter(|s| s.seller_id() == seller_id)
            .max_by_key(|s| (s.submitted_at(), *s.id_typed().as_uuid()))
            .cloned())
    }

    fn products_by_seller(&self, seller_id: SellerId) -> StoreResult<Vec<Product>> {
        let records = self.read()?;
        let mut products: Vec<Product> = records
            .products
            .values()
            .filter(|p| p.seller_id() == seller_id)
            .cloned()
            .collect();
        products.sort_by_key(|p| *p.id_typed().as_uuid());
        Ok(products)
    }

    fn active_products_in_category(&self, category: &str) -> StoreResult<Vec<Product>> {
        let records = self.read()?;
        let mut products: Vec<Product> = records
            .products
            .values()
            .filter(|p| p.is_active() && p.category() == category)
            .cloned()
            .collect();
        products.sort_by_key(|p| *p.id_typed().as_uuid());
        Ok(products)
    }

    fn reviews_for_product(&self, product_id: ProductId) -> StoreResult<Vec<Review>> {
        let records = self.read()?;
        let mut reviews: Vec<Review> = records
            .reviews
            .values()
            .filter(|r| r.product_id() == product_id)
            .cloned()
            .collect();
        reviews.sort_by_key(|r| *r.id_typed().as_uuid());
        Ok(reviews)
    }

    fn orders_for_product(&self, product_id: ProductId) -> StoreResult<Vec<Order>> {
        let records = self.read()?;
        let mut orders: Vec<Order> = records
            .orders
            .values()
            .filter(|o| o.units_of(product_id) > 0)
            .cloned()
            .collect();
        orders.sort_by_key(|o| *o.id_typed().as_uuid());
        Ok(orders)
    }

    fn orders_for_seller(&self, seller_id: SellerId) -> StoreResult<Vec<Order>> {
        let records = self.read()?;
        let mut orders: Vec<Order> = records
            .orders
            .values()
            .filter(|o| o.contains_seller(seller_id))
            .cloned()
            .collect();
        orders.sort_by_key(|o| *o.id_typed().as_uuid());
        Ok(orders)
    }

    fn commit(&self, transaction: Transaction) -> StoreResult<()> {
        let writes = transaction.into_writes();
        if writes.is_empty() {
            return Ok(());
        }

        // A batch may write each record at most once; a second write would
        // silently stomp the first.
        let mut seen = HashSet::new();
        for (write, _) in &writes {
            if !seen.insert(write.key()) {
                return Err(StoreError::Conflict(format!(
                    "transaction contains two writes for {} {}",
                    write.kind(),
                    write.record_id()
                )));
            }
        }

        let mut records = self.write()?;

        // Validate every expectation before applying anything.
        for (write, expected) in &writes {
            let current = records.version_of(write);
            if !expected.matches(current) {
                return Err(StoreError::Conflict(format!(
                    "version check failed for {} {}: expected {:?}, found {}",
                    write.kind(),
                    write.record_id(),
                    expected,
                    current
                )));
            }
        }

        for (write, _) in writes {
            records.apply(write);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use fairmarket_core::ExpectedVersion;
    use fairmarket_sellers::{IdDocumentType, KycDocumentRefs};

    fn test_seller() -> Seller {
        Seller::register(
            SellerId::new(),
            fairmarket_core::UserId::new(),
            "Lagos Leatherworks",
            "Handmade leather goods",
            "fashion",
            Utc::now(),
        )
        .unwrap()
    }

    fn test_product(seller_id: SellerId, category: &str, price: u64) -> Product {
        Product::list(
            ProductId::new(),
            seller_id,
            "Belt",
            "",
            category,
            price,
            None,
            10,
            Utc::now(),
        )
        .unwrap()
    }

    fn test_submission(seller_id: SellerId, submitted_at: chrono::DateTime<Utc>) -> KycSubmission {
        KycSubmission::submit(
            SubmissionId::new(),
            seller_id,
            KycDocumentRefs {
                id_type: IdDocumentType::Passport,
                id_number: "A1234567".to_string(),
                document_url: "https://cdn.example/kyc/passport.pdf".to_string(),
            },
            submitted_at,
        )
        .unwrap()
    }

    fn commit_one(store: &MemoryStore, write: impl Into<RecordWrite>) {
        let mut tx = Transaction::new();
        tx.put(write);
        store.commit(tx).unwrap();
    }

    #[test]
    fn commit_assigns_version_one_to_new_records() {
        let store = MemoryStore::new();
        let seller = test_seller();
        let id = seller.id_typed();

        commit_one(&store, seller);

        let stored = store.seller(id).unwrap().unwrap();
        assert_eq!(stored.version(), 1);
    }

    #[test]
    fn commit_bumps_version_on_each_update() {
        let store = MemoryStore::new();
        let seller = test_seller();
        let id = seller.id_typed();
        commit_one(&store, seller);

        let stored = store.seller(id).unwrap().unwrap();
        commit_one(&store, stored);

        assert_eq!(store.seller(id).unwrap().unwrap().version(), 2);
    }

    #[test]
    fn commit_rejects_stale_versions() {
        let store = MemoryStore::new();
        let seller = test_seller();
        let id = seller.id_typed();
        commit_one(&store, seller);

        let first_read = store.seller(id).unwrap().unwrap();
        let second_read = store.seller(id).unwrap().unwrap();

        commit_one(&store, first_read);

        // The second reader still holds version 1; the store is at 2.
        let mut tx = Transaction::new();
        tx.put(second_read);
        let err = store.commit(tx).unwrap_err();
        match err {
            StoreError::Conflict(_) => {}
            other => panic!("expected Conflict error, got {other:?}"),
        }
    }

    #[test]
    fn commit_rejects_writes_for_unexpectedly_existing_records() {
        let store = MemoryStore::new();
        let seller = test_seller();
        commit_one(&store, seller.clone());

        // Re-inserting the same version-0 record expects absence.
        let mut tx = Transaction::new();
        tx.put(seller);
        assert!(store.commit(tx).is_err());
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let store = MemoryStore::new();
        let seller = test_seller();
        let seller_id = seller.id_typed();
        let product = test_product(seller_id, "fashion", 5_000);
        let product_id = product.id_typed();
        commit_one(&store, product.clone());

        // Batch: a fresh seller (valid) plus a stale product write.
        let mut tx = Transaction::new();
        tx.put(seller);
        tx.put(product);
        let err = store.commit(tx).unwrap_err();
        match err {
            StoreError::Conflict(_) => {}
            other => panic!("expected Conflict error, got {other:?}"),
        }

        // The valid half of the batch must not have been applied.
        assert!(store.seller(seller_id).unwrap().is_none());
        assert_eq!(store.product(product_id).unwrap().unwrap().version(), 1);
    }

    #[test]
    fn commit_rejects_two_writes_for_the_same_record() {
        let store = MemoryStore::new();
        let seller = test_seller();

        let mut tx = Transaction::new();
        tx.put(seller.clone());
        tx.put(seller);
        let err = store.commit(tx).unwrap_err();
        match err {
            StoreError::Conflict(_) => {}
            other => panic!("expected Conflict error, got {other:?}"),
        }
    }

    #[test]
    fn commit_accepts_the_empty_transaction() {
        let store = MemoryStore::new();
        store.commit(Transaction::new()).unwrap();
    }

    #[test]
    fn put_with_any_upserts_unconditionally() {
        let store = MemoryStore::new();
        let seller = test_seller();
        let id = seller.id_typed();
        commit_one(&store, seller.clone());
        commit_one(&store, store.seller(id).unwrap().unwrap());
        assert_eq!(store.seller(id).unwrap().unwrap().version(), 2);

        // A stale copy still lands when the caller opts out of the check.
        let mut tx = Transaction::new();
        tx.put_with(seller, ExpectedVersion::Any);
        store.commit(tx).unwrap();
        assert_eq!(store.seller(id).unwrap().unwrap().version(), 3);
    }

    #[test]
    fn current_kyc_submission_picks_the_latest_of_the_chain() {
        let store = MemoryStore::new();
        let seller_id = SellerId::new();
        let t0 = Utc::now();

        let older = test_submission(seller_id, t0);
        let newer = test_submission(seller_id, t0 + Duration::seconds(60));
        let newer_id = newer.id_typed();
        let unrelated = test_submission(SellerId::new(), t0 + Duration::seconds(120));

        commit_one(&store, newer);
        commit_one(&store, older);
        commit_one(&store, unrelated);

        let current = store.current_kyc_submission(seller_id).unwrap().unwrap();
        assert_eq!(current.id_typed(), newer_id);

        assert!(store
            .current_kyc_submission(SellerId::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn active_products_in_category_filters_inactive_and_foreign_listings() {
        let store = MemoryStore::new();
        let seller_id = SellerId::new();

        let in_category = test_product(seller_id, "electronics", 100);
        let in_category_id = in_category.id_typed();
        let mut inactive = test_product(seller_id, "electronics", 200);
        inactive.set_active(false);
        let other_category = test_product(seller_id, "fashion", 300);

        commit_one(&store, in_category);
        commit_one(&store, inactive);
        commit_one(&store, other_category);

        let active = store.active_products_in_category("electronics").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id_typed(), in_category_id);

        assert!(store.active_products_in_category("toys").unwrap().is_empty());
    }

    #[test]
    fn order_queries_filter_by_line_contents() {
        use fairmarket_core::{OrderId, UserId};
        use fairmarket_orders::OrderItem;

        let store = MemoryStore::new();
        let seller_a = SellerId::new();
        let seller_b = SellerId::new();
        let product = ProductId::new();

        let with_product = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![OrderItem {
                product_id: product,
                seller_id: seller_a,
                quantity: 2,
                price_at_purchase: 100,
            }],
            "12 Marina Road, Lagos",
            Utc::now(),
        )
        .unwrap();
        let without_product = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![OrderItem {
                product_id: ProductId::new(),
                seller_id: seller_b,
                quantity: 1,
                price_at_purchase: 500,
            }],
            "12 Marina Road, Lagos",
            Utc::now(),
        )
        .unwrap();

        commit_one(&store, with_product);
        commit_one(&store, without_product);

        assert_eq!(store.orders_for_product(product).unwrap().len(), 1);
        assert_eq!(store.orders_for_seller(seller_a).unwrap().len(), 1);
        assert_eq!(store.orders_for_seller(seller_b).unwrap().len(), 1);
        assert!(store.orders_for_seller(SellerId::new()).unwrap().is_empty());
    }

    #[test]
    fn products_by_seller_returns_only_that_sellers_listings() {
        let store = MemoryStore::new();
        let seller_a = SellerId::new();
        let seller_b = SellerId::new();

        commit_one(&store, test_product(seller_a, "fashion", 100));
        commit_one(&store, test_product(seller_a, "fashion", 200));
        commit_one(&store, test_product(seller_b, "fashion", 300));

        assert_eq!(store.products_by_seller(seller_a).unwrap().len(), 2);
        assert_eq!(store.products_by_seller(seller_b).unwrap().len(), 1);
    }
}
