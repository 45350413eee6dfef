use std::collections::HashMap;
use std::slice;

use chrono::{Duration, Utc};

use fairmarket_catalog::{assess, reference_price, PriceAssessment, Product};
use fairmarket_core::{
    DomainError, DomainResult, OrderId, ProductId, ReviewId, SellerId, SubmissionId, UserId,
};
use fairmarket_orders::{Order, OrderItem};
use fairmarket_reviews::{summarize_ratings, Rating, Review};
use fairmarket_sellers::{
    compute_trust_score, KycDocumentRefs, KycOutcome, KycSubmission, Seller, SellerStatus,
    TrustSignals,
};
use fairmarket_store::{RecordStore, StoreError, Transaction};

use crate::commands::{CreateProduct, PlaceOrder, PostReview, RegisterSeller, UpdateSellerProfile};
use crate::error::{EngineError, EngineResult};
use crate::policy::EnginePolicy;
use crate::snapshots::{ProductPriceFlag, SellerSnapshot, SellerTrust};
use crate::sweep::{CategorySweep, SweepFailure, SweepSchedule};

/// Trust and price-integrity orchestrator.
///
/// The domain crates hold the rules (scoring, state machines, the price
/// classifier); the store holds the records; this type owns the sequencing
/// that keeps the derived state consistent.
///
/// ## Recomputation order
///
/// Every mutating operation runs the same pipeline over the records it
/// touches:
///
/// 1. load the records,
/// 2. mutate them through their domain methods,
/// 3. settle price flags (flags feed the trust signals),
/// 4. recompute the affected sellers' trust scores,
/// 5. re-evaluate the status policy against the new scores,
/// 6. commit everything in one atomic batch.
///
/// ## Concurrency
///
/// Commits use the store's optimistic versioning. When a batch loses a
/// version race the whole unit is re-read, recomputed, and retried a bounded
/// number of times (`EnginePolicy::write_retries`); a race that outlives the
/// retries surfaces as [`EngineError::Conflict`].
///
/// ## Category sweeps
///
/// Operations that can move a category's reference price (listing, repricing,
/// recategorizing, deactivating) settle the triggering record synchronously,
/// then sweep the rest of the category: a read-only snapshot fixes the new
/// reference, and each neighbor is settled in its own small retried
/// transaction, with failures isolated and collected rather than aborting the
/// batch. Sweeps are debounced per category (`EnginePolicy::sweep_debounce_secs`);
/// [`Engine::reclassify_category`] bypasses the debounce.
pub struct Engine<S> {
    store: S,
    policy: EnginePolicy,
    sweeps: SweepSchedule,
}

impl<S: RecordStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, EnginePolicy::default())
    }

    pub fn with_policy(store: S, policy: EnginePolicy) -> Self {
        Self {
            store,
            policy,
            sweeps: SweepSchedule::default(),
        }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Direct read access to the underlying store, for lookups the engine
    /// does not wrap (catalog browsing, order history).
    pub fn store(&self) -> &S {
        &self.store
    }

    // ---------------------------------------------------------------- sellers

    /// Register a seller profile. New sellers start pending, unverified, at
    /// the neutral trust score.
    pub fn register_seller(&self, command: RegisterSeller) -> EngineResult<Seller> {
        let seller = Seller::register(
            SellerId::new(),
            command.user_id,
            command.business_name,
            command.description,
            command.category,
            Utc::now(),
        )?;
        let seller_id = seller.id_typed();

        let mut transaction = Transaction::new();
        transaction.put(seller);
        self.store.commit(transaction)?;

        tracing::info!("Registered seller {}", seller_id);
        self.require_seller(seller_id)
    }

    /// Edit a seller's public profile. Profile text never feeds the trust
    /// signals, so no recomputation follows.
    pub fn update_seller_profile(&self, command: UpdateSellerProfile) -> EngineResult<Seller> {
        let seller_id = command.seller_id;
        self.commit_with_retries(|| {
            let mut seller = self.require_seller(seller_id)?;
            seller.update_profile(
                command.business_name.clone(),
                command.description.clone(),
                command.logo_url.clone(),
            )?;
            let mut transaction = Transaction::new();
            transaction.put(seller);
            Ok((transaction, ()))
        })?;

        tracing::info!("Updated profile of seller {}", seller_id);
        self.require_seller(seller_id)
    }

    /// File a KYC submission for review.
    ///
    /// One pending submission per seller at a time; a rejected seller files a
    /// fresh submission rather than amending the old one. The seller's
    /// chain-level state moves to pending in the same batch.
    pub fn submit_kyc(
        &self,
        seller_id: SellerId,
        documents: KycDocumentRefs,
    ) -> EngineResult<KycSubmission> {
        let submission_id = self.commit_with_retries(|| {
            let mut seller = self.require_seller(seller_id)?;
            seller.begin_kyc_review()?;

            let submission = KycSubmission::submit(
                SubmissionId::new(),
                seller_id,
                documents.clone(),
                Utc::now(),
            )?;
            let submission_id = submission.id_typed();

            let mut transaction = Transaction::new();
            transaction.put(seller);
            transaction.put(submission);
            Ok((transaction, submission_id))
        })?;

        tracing::info!("Filed KYC submission {} for seller {}", submission_id, seller_id);
        self.require_submission(submission_id)
    }

    /// Decide a pending KYC submission, exactly once.
    ///
    /// The decision, the seller's chain state, the recomputed trust score,
    /// and any status transition (approval can activate a pending seller)
    /// land in one batch.
    pub fn decide_kyc(
        &self,
        submission_id: SubmissionId,
        outcome: KycOutcome,
        reviewer: UserId,
        notes: Option<String>,
    ) -> EngineResult<SellerSnapshot> {
        let seller_id = self.commit_with_retries(|| {
            let mut submission = self.require_submission(submission_id)?;
            let seller_id = submission.seller_id();
            let mut seller = self.require_seller(seller_id)?;

            submission.decide(outcome, reviewer, notes.clone(), Utc::now())?;
            seller.record_kyc_outcome(outcome)?;
            self.refresh_seller(&mut seller, &[], None)?;

            let mut transaction = Transaction::new();
            transaction.put(submission);
            transaction.put(seller);
            Ok((transaction, seller_id))
        })?;

        let seller = self.require_seller(seller_id)?;
        tracing::info!(
            "Decided KYC submission {} ({:?}): seller {} now {} at trust {}",
            submission_id,
            outcome,
            seller_id,
            seller.status(),
            seller.trust_score()
        );
        Ok(SellerSnapshot::from(&seller))
    }

    /// Administrative ban. Terminal: never reversed, never applied by the
    /// status policy.
    pub fn ban_seller(&self, seller_id: SellerId) -> EngineResult<SellerSnapshot> {
        let snapshot = self.commit_with_retries(|| {
            let mut seller = self.require_seller(seller_id)?;
            seller.ban()?;
            let snapshot = SellerSnapshot::from(&seller);
            let mut transaction = Transaction::new();
            transaction.put(seller);
            Ok((transaction, snapshot))
        })?;

        tracing::warn!("Banned seller {}", seller_id);
        Ok(snapshot)
    }

    /// Current trust score and status of a seller.
    pub fn get_seller_trust(&self, seller_id: SellerId) -> EngineResult<SellerTrust> {
        let seller = self.require_seller(seller_id)?;
        Ok(SellerTrust {
            seller_id,
            score: seller.trust_score(),
            status: seller.status(),
        })
    }

    // ---------------------------------------------------------------- catalog

    /// Create a product listing, classified against its category on the way
    /// in.
    ///
    /// Any non-banned seller may list; whether the listing is purchasable is
    /// decided at order time by the seller's status.
    pub fn create_product(&self, command: CreateProduct) -> EngineResult<Product> {
        let (product_id, category) = self.commit_with_retries(|| {
            let mut seller = self.require_seller(command.seller_id)?;
            if seller.status() == SellerStatus::Banned {
                return Err(EngineError::InvalidState(
                    "banned sellers cannot list products".to_string(),
                ));
            }

            let mut product = Product::list(
                ProductId::new(),
                command.seller_id,
                command.name.clone(),
                command.description.clone(),
                command.category.clone(),
                command.price,
                command.original_price,
                command.stock,
                Utc::now(),
            )?;
            let assessment = self.assess_against_category(&product)?;
            product.apply_assessment(assessment);

            self.refresh_seller(&mut seller, slice::from_ref(&product), None)?;

            let product_id = product.id_typed();
            let category = product.category().to_string();
            let mut transaction = Transaction::new();
            transaction.put(product);
            transaction.put(seller);
            Ok((transaction, (product_id, category)))
        })?;

        tracing::info!("Listed product {} in category '{}'", product_id, category);
        self.sweep_after(&category);
        self.require_product(product_id)
    }

    /// Change a listing's price. The listing itself is re-classified
    /// synchronously; the rest of its category follows via a debounced sweep.
    pub fn update_price(
        &self,
        product_id: ProductId,
        new_price: u64,
    ) -> EngineResult<ProductPriceFlag> {
        let (snapshot, category) = self.commit_with_retries(|| {
            let mut product = self.require_product(product_id)?;
            product.change_price(new_price)?;
            self.settle_product_price(product)
        })?;

        tracing::info!(
            "Updated price of product {} to {} ({})",
            product_id,
            new_price,
            snapshot.flag
        );
        self.sweep_after(&category);
        Ok(snapshot)
    }

    /// Trigger: the listing's price was already persisted by the transport
    /// layer; re-assess the flag and the seller's trust from stored state.
    pub fn on_product_price_changed(
        &self,
        product_id: ProductId,
    ) -> EngineResult<ProductPriceFlag> {
        let (snapshot, category) = self.commit_with_retries(|| {
            let product = self.require_product(product_id)?;
            self.settle_product_price(product)
        })?;

        self.sweep_after(&category);
        Ok(snapshot)
    }

    /// Move a listing to another category. Both reference samples move: the
    /// category it left and the one it joined, so both are swept.
    pub fn change_category(
        &self,
        product_id: ProductId,
        new_category: &str,
    ) -> EngineResult<Product> {
        let (old_category, moved_to) = self.commit_with_retries(|| {
            let mut product = self.require_product(product_id)?;
            let old_category = product.category().to_string();
            product.change_category(new_category)?;
            let (transaction, (_, moved_to)) = self.settle_product_price(product)?;
            Ok((transaction, (old_category, moved_to)))
        })?;

        tracing::info!(
            "Moved product {} from category '{}' to '{}'",
            product_id,
            old_category,
            moved_to
        );
        if old_category != moved_to {
            self.sweep_after(&old_category);
        }
        self.sweep_after(&moved_to);
        self.require_product(product_id)
    }

    /// Activate or deactivate a listing.
    ///
    /// A deactivated listing leaves the category's reference sample and loses
    /// its flag (it is no longer offered, so it carries no price signal); the
    /// seller's trust is refreshed in the same batch.
    pub fn set_product_active(&self, product_id: ProductId, active: bool) -> EngineResult<Product> {
        let category = self.commit_with_retries(|| {
            let mut product = self.require_product(product_id)?;
            product.set_active(active);
            let (transaction, (_, category)) = self.settle_product_price(product)?;
            Ok((transaction, category))
        })?;

        self.sweep_after(&category);
        self.require_product(product_id)
    }

    /// Current price flag and recommendation of a listing.
    pub fn get_product_price_flag(&self, product_id: ProductId) -> EngineResult<ProductPriceFlag> {
        let product = self.require_product(product_id)?;
        Ok(ProductPriceFlag {
            product_id,
            flag: product.price_flag(),
            recommended_price: product.recommended_price(),
        })
    }

    /// Force a full re-classification sweep of a category, bypassing the
    /// debounce clock (the clock still records the run).
    pub fn reclassify_category(&self, category: &str) -> EngineResult<CategorySweep> {
        if category.trim().is_empty() {
            return Err(EngineError::Validation("category cannot be empty".to_string()));
        }
        let sweep = self.sweep_category(category)?;
        self.sweeps.record(category, Utc::now());
        Ok(sweep)
    }

    // ---------------------------------------------------------------- reviews

    /// Post a customer review.
    ///
    /// The rating is validated into `1..=5`; `verified_purchase` is stamped
    /// from the author's delivered orders, never accepted from the caller.
    /// The product's aggregates and the seller's trust move in the same
    /// batch.
    pub fn post_review(&self, command: PostReview) -> EngineResult<Review> {
        let rating = Rating::new(command.rating)?;

        let review_id = self.commit_with_retries(|| {
            let mut product = self.require_product(command.product_id)?;

            let verified_purchase = self
                .store
                .orders_for_product(command.product_id)?
                .iter()
                .any(|order| order.is_delivered() && order.user_id() == command.user_id);

            let review = Review::post(
                ReviewId::new(),
                command.product_id,
                command.user_id,
                rating,
                command.title.clone(),
                command.body.clone(),
                verified_purchase,
                Utc::now(),
            )?;
            let review_id = review.id_typed();

            // Fold the new review into the stored ones for the aggregates.
            let mut ratings: Vec<Rating> = self
                .store
                .reviews_for_product(command.product_id)?
                .iter()
                .map(Review::rating)
                .collect();
            ratings.push(rating);
            if let Some(summary) = summarize_ratings(&ratings) {
                product.record_review_aggregates(summary.average, summary.count);
            }

            let mut seller = self.require_seller(product.seller_id())?;
            self.refresh_seller(&mut seller, slice::from_ref(&product), None)?;

            let mut transaction = Transaction::new();
            transaction.put(review);
            transaction.put(product);
            transaction.put(seller);
            Ok((transaction, review_id))
        })?;

        tracing::info!(
            "Posted review {} on product {} ({} stars)",
            review_id,
            command.product_id,
            command.rating
        );
        self.require_review(review_id)
    }

    /// Trigger: a review was already persisted by the transport layer;
    /// recompute the product's aggregates and the seller's trust from
    /// stored reviews.
    pub fn on_review_posted(&self, review_id: ReviewId) -> EngineResult<SellerTrust> {
        let seller_id = self.commit_with_retries(|| {
            let review = self.require_review(review_id)?;
            let mut product = self.require_product(review.product_id())?;

            let ratings: Vec<Rating> = self
                .store
                .reviews_for_product(product.id_typed())?
                .iter()
                .map(Review::rating)
                .collect();
            if let Some(summary) = summarize_ratings(&ratings) {
                product.record_review_aggregates(summary.average, summary.count);
            }

            let mut seller = self.require_seller(product.seller_id())?;
            self.refresh_seller(&mut seller, slice::from_ref(&product), None)?;
            let seller_id = seller.id_typed();

            let mut transaction = Transaction::new();
            transaction.put(product);
            transaction.put(seller);
            Ok((transaction, seller_id))
        })?;

        self.get_seller_trust(seller_id)
    }

    // ----------------------------------------------------------------- orders

    /// Place an order.
    ///
    /// Every line must reference an active listing whose seller is allowed to
    /// sell. Unit prices are frozen at placement and stock is reserved, all
    /// in the same batch as the order itself; duplicate lines for one product
    /// reserve from a single working copy so the product gets exactly one
    /// write.
    pub fn place_order(&self, command: PlaceOrder) -> EngineResult<Order> {
        let order_id = self.commit_with_retries(|| {
            let mut products: HashMap<ProductId, Product> = HashMap::new();
            let mut items = Vec::with_capacity(command.lines.len());

            for line in &command.lines {
                let mut product = match products.remove(&line.product_id) {
                    Some(product) => product,
                    None => {
                        let product = self.require_product(line.product_id)?;
                        if !product.is_active() {
                            return Err(EngineError::InvalidState(format!(
                                "product {} is not available for purchase",
                                line.product_id
                            )));
                        }
                        let seller = self.require_seller(product.seller_id())?;
                        if !seller.can_sell() {
                            return Err(EngineError::InvalidState(format!(
                                "seller {} cannot sell while {}",
                                seller.id_typed(),
                                seller.status()
                            )));
                        }
                        product
                    }
                };
                product.reserve_stock(line.quantity)?;
                items.push(OrderItem {
                    product_id: line.product_id,
                    seller_id: product.seller_id(),
                    quantity: line.quantity,
                    price_at_purchase: product.price(),
                });
                products.insert(line.product_id, product);
            }

            let order = Order::place(
                OrderId::new(),
                command.user_id,
                items,
                command.shipping_address.clone(),
                Utc::now(),
            )?;
            let order_id = order.id_typed();

            let mut transaction = Transaction::new();
            transaction.put(order);
            for product in products.into_values() {
                transaction.put(product);
            }
            Ok((transaction, order_id))
        })?;

        tracing::info!("Placed order {}", order_id);
        self.require_order(order_id)
    }

    pub fn mark_order_processing(&self, order_id: OrderId) -> EngineResult<Order> {
        self.transition_order(order_id, |order| order.mark_processing())
    }

    pub fn mark_order_shipped(&self, order_id: OrderId) -> EngineResult<Order> {
        self.transition_order(order_id, |order| order.mark_shipped())
    }

    /// Deliver a shipped order and run the completion flow: delivered-units
    /// counters on its products and trust refreshes for its sellers, all in
    /// the same transaction as the status change.
    pub fn mark_order_delivered(&self, order_id: OrderId) -> EngineResult<Order> {
        let seller_count = self.commit_with_retries(|| {
            let mut order = self.require_order(order_id)?;
            order.mark_delivered()?;

            let (products, sellers) = self.order_completion_updates(&order)?;
            let seller_count = sellers.len();

            let mut transaction = Transaction::new();
            transaction.put(order);
            for product in products {
                transaction.put(product);
            }
            for seller in sellers {
                transaction.put(seller);
            }
            Ok((transaction, seller_count))
        })?;

        tracing::info!(
            "Delivered order {}; refreshed trust for {} seller(s)",
            order_id,
            seller_count
        );
        self.require_order(order_id)
    }

    /// Cancel an order before shipment, returning its reserved stock.
    pub fn cancel_order(&self, order_id: OrderId) -> EngineResult<Order> {
        self.commit_with_retries(|| {
            let mut order = self.require_order(order_id)?;
            order.cancel()?;

            // Return each line's reservation; duplicate lines merge into one
            // write per product.
            let mut products: HashMap<ProductId, Product> = HashMap::new();
            for item in order.items() {
                let mut product = match products.remove(&item.product_id) {
                    Some(product) => product,
                    None => match self.store.product(item.product_id)? {
                        Some(product) => product,
                        // A delisted product no longer holds stock to return.
                        None => continue,
                    },
                };
                product.restore_stock(item.quantity);
                products.insert(item.product_id, product);
            }

            let mut transaction = Transaction::new();
            transaction.put(order);
            for product in products.into_values() {
                transaction.put(product);
            }
            Ok((transaction, ()))
        })?;

        tracing::info!("Cancelled order {}", order_id);
        self.require_order(order_id)
    }

    /// Trigger: the order already reached delivered outside
    /// [`Engine::mark_order_delivered`]; recompute its products'
    /// delivered-units counters and its sellers' trust.
    ///
    /// Idempotent: the counters are derived from the stored order history,
    /// so re-running the trigger converges instead of accumulating.
    pub fn on_order_completed(&self, order_id: OrderId) -> EngineResult<Vec<SellerTrust>> {
        let seller_ids = self.commit_with_retries(|| {
            let order = self.require_order(order_id)?;
            if !order.is_delivered() {
                return Err(EngineError::InvalidState(format!(
                    "order {} is {}, not delivered",
                    order_id,
                    order.status()
                )));
            }

            let (products, sellers) = self.order_completion_updates(&order)?;
            let seller_ids: Vec<SellerId> = sellers.iter().map(Seller::id_typed).collect();

            let mut transaction = Transaction::new();
            for product in products {
                transaction.put(product);
            }
            for seller in sellers {
                transaction.put(seller);
            }
            Ok((transaction, seller_ids))
        })?;

        seller_ids
            .into_iter()
            .map(|seller_id| self.get_seller_trust(seller_id))
            .collect()
    }

    // ---------------------------------------------------------- write units

    /// Run a read-compute-commit unit under bounded optimistic retry.
    ///
    /// The closure builds the whole transaction from fresh reads; only a
    /// commit-time version race retries it. Domain conflicts (duplicate
    /// submission, insufficient stock) are not races and propagate
    /// immediately.
    fn commit_with_retries<T>(
        &self,
        mut unit: impl FnMut() -> EngineResult<(Transaction, T)>,
    ) -> EngineResult<T> {
        let mut attempts = 0;
        loop {
            let (transaction, output) = unit()?;
            match self.store.commit(transaction) {
                Ok(()) => return Ok(output),
                Err(StoreError::Conflict(reason)) if attempts < self.policy.write_retries => {
                    attempts += 1;
                    tracing::debug!(
                        "Version race ({}), retrying write unit (attempt {})",
                        reason,
                        attempts
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn require_seller(&self, seller_id: SellerId) -> EngineResult<Seller> {
        self.store
            .seller(seller_id)?
            .ok_or_else(|| EngineError::NotFound(format!("seller {seller_id} not found")))
    }

    fn require_product(&self, product_id: ProductId) -> EngineResult<Product> {
        self.store
            .product(product_id)?
            .ok_or_else(|| EngineError::NotFound(format!("product {product_id} not found")))
    }

    fn require_submission(&self, submission_id: SubmissionId) -> EngineResult<KycSubmission> {
        self.store.kyc_submission(submission_id)?.ok_or_else(|| {
            EngineError::NotFound(format!("kyc submission {submission_id} not found"))
        })
    }

    fn require_review(&self, review_id: ReviewId) -> EngineResult<Review> {
        self.store
            .review(review_id)?
            .ok_or_else(|| EngineError::NotFound(format!("review {review_id} not found")))
    }

    fn require_order(&self, order_id: OrderId) -> EngineResult<Order> {
        self.store
            .order(order_id)?
            .ok_or_else(|| EngineError::NotFound(format!("order {order_id} not found")))
    }

    fn transition_order(
        &self,
        order_id: OrderId,
        transition: impl Fn(&mut Order) -> DomainResult<()>,
    ) -> EngineResult<Order> {
        self.commit_with_retries(|| {
            let mut order = self.require_order(order_id)?;
            transition(&mut order)?;
            let mut transaction = Transaction::new();
            transaction.put(order);
            Ok((transaction, ()))
        })?;
        self.require_order(order_id)
    }

    // ------------------------------------------------------- trust plumbing

    /// Assemble the trust signals snapshot for a seller.
    ///
    /// `updated_products` overlays the stored catalog: records the calling
    /// operation has already mutated (possibly not yet persisted) replace
    /// their stored copies, so the computation sees the state being
    /// committed. `order_overlay` does the same for a single order.
    fn trust_signals(
        &self,
        seller: &Seller,
        updated_products: &[Product],
        order_overlay: Option<&Order>,
    ) -> EngineResult<TrustSignals> {
        let seller_id = seller.id_typed();

        let mut products = self.store.products_by_seller(seller_id)?;
        for updated in updated_products {
            if updated.seller_id() != seller_id {
                continue;
            }
            match products
                .iter_mut()
                .find(|stored| stored.id_typed() == updated.id_typed())
            {
                Some(stored) => *stored = updated.clone(),
                None => products.push(updated.clone()),
            }
        }

        // Unweighted mean across products that have been reviewed; an
        // unreviewed catalog contributes no rating signal at all.
        let rated: Vec<f64> = products
            .iter()
            .filter(|product| product.has_reviews())
            .map(Product::avg_rating)
            .collect();
        let avg_product_rating = if rated.is_empty() {
            None
        } else {
            Some(rated.iter().sum::<f64>() / rated.len() as f64)
        };

        let suspicious_products = products
            .iter()
            .filter(|product| product.price_flag().is_suspicious())
            .count() as u32;

        Ok(TrustSignals {
            kyc_status: seller.kyc_status(),
            delivered_orders: self.delivered_orders_for(seller_id, order_overlay)?,
            avg_product_rating,
            suspicious_products,
        })
    }

    /// Distinct delivered orders containing the seller, substituting the
    /// overlay order for its stored copy.
    fn delivered_orders_for(
        &self,
        seller_id: SellerId,
        overlay: Option<&Order>,
    ) -> EngineResult<u64> {
        let orders = self.store.orders_for_seller(seller_id)?;
        let mut delivered = orders
            .iter()
            .filter(|stored| overlay.is_none_or(|o| o.id_typed() != stored.id_typed()))
            .filter(|stored| stored.is_delivered())
            .count() as u64;
        if let Some(order) = overlay {
            if order.is_delivered() && order.contains_seller(seller_id) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Recompute a seller's trust score from current signals and re-evaluate
    /// the status policy. Mutates in place; the caller commits.
    fn refresh_seller(
        &self,
        seller: &mut Seller,
        updated_products: &[Product],
        order_overlay: Option<&Order>,
    ) -> EngineResult<()> {
        let signals = self.trust_signals(seller, updated_products, order_overlay)?;
        let score = compute_trust_score(&signals, &self.policy.trust);
        seller.record_trust_score(score);
        if let Some(next) = seller.reevaluate_status(&self.policy.status)? {
            tracing::info!(
                "Seller {} moved to {} at trust {}",
                seller.id_typed(),
                next,
                score
            );
        }
        Ok(())
    }

    /// Records to rewrite when `order` counts as completed: each product's
    /// delivered-units counter and each affected seller's trust.
    ///
    /// `order` is the local delivered copy; stored copies are substituted by
    /// id wherever the recomputation iterates order history.
    fn order_completion_updates(&self, order: &Order) -> EngineResult<(Vec<Product>, Vec<Seller>)> {
        let mut products = Vec::new();
        for product_id in order.product_ids() {
            // A listing can be deleted between placement and delivery; the
            // remaining updates still apply.
            let Some(mut product) = self.store.product(product_id)? else {
                continue;
            };
            product.record_sold_count(self.delivered_units_of(product_id, order)?);
            products.push(product);
        }

        let mut sellers = Vec::new();
        for seller_id in order.seller_ids() {
            let Some(mut seller) = self.store.seller(seller_id)? else {
                continue;
            };
            self.refresh_seller(&mut seller, &products, Some(order))?;
            sellers.push(seller);
        }

        Ok((products, sellers))
    }

    /// Units of a product across delivered orders, substituting the local
    /// copy of `order` for its stored one.
    fn delivered_units_of(&self, product_id: ProductId, order: &Order) -> EngineResult<u64> {
        let orders = self.store.orders_for_product(product_id)?;
        let mut units: u64 = orders
            .iter()
            .filter(|stored| stored.id_typed() != order.id_typed())
            .filter(|stored| stored.is_delivered())
            .map(|stored| stored.units_of(product_id))
            .sum();
        if order.is_delivered() {
            units += order.units_of(product_id);
        }
        Ok(units)
    }

    // ------------------------------------------------------ price plumbing

    /// Assess one listing against its category's reference price.
    ///
    /// The sample is the category's stored active listings with the listing
    /// itself substituted (or appended when not yet persisted), so a listing
    /// always participates in its own reference. Inactive listings are not
    /// offered and carry no flag.
    fn assess_against_category(&self, product: &Product) -> EngineResult<PriceAssessment> {
        if !product.is_active() {
            return Ok(PriceAssessment::unclassified());
        }

        let mut sample = self.store.active_products_in_category(product.category())?;
        match sample
            .iter_mut()
            .find(|stored| stored.id_typed() == product.id_typed())
        {
            Some(stored) => *stored = product.clone(),
            None => sample.push(product.clone()),
        }
        let prices: Vec<u64> = sample.iter().map(Product::price).collect();

        let reference = match reference_price(&prices, &self.policy.pricing) {
            Ok(reference) => Some(reference),
            // Thin category: degrade to the unflagged assessment.
            Err(DomainError::InsufficientData(_)) => None,
            Err(err) => return Err(err.into()),
        };
        Ok(assess(product.price(), reference, &self.policy.pricing))
    }

    /// Build the transaction settling a mutated listing: re-assess its
    /// price, refresh its seller, queue both writes.
    fn settle_product_price(
        &self,
        mut product: Product,
    ) -> EngineResult<(Transaction, (ProductPriceFlag, String))> {
        let assessment = self.assess_against_category(&product)?;
        product.apply_assessment(assessment);

        let mut seller = self.require_seller(product.seller_id())?;
        self.refresh_seller(&mut seller, slice::from_ref(&product), None)?;

        let snapshot = ProductPriceFlag {
            product_id: product.id_typed(),
            flag: product.price_flag(),
            recommended_price: product.recommended_price(),
        };
        let category = product.category().to_string();

        let mut transaction = Transaction::new();
        transaction.put(product);
        transaction.put(seller);
        Ok((transaction, (snapshot, category)))
    }

    /// Trigger a debounced sweep of a category after an operation that may
    /// have moved its reference. The triggering record is already settled,
    /// so a skipped sweep only delays neighbors.
    fn sweep_after(&self, category: &str) {
        let debounce = Duration::seconds(self.policy.sweep_debounce_secs as i64);
        if !self.sweeps.try_begin(category, Utc::now(), debounce) {
            tracing::debug!("Sweep of category '{}' debounced", category);
            return;
        }
        if let Err(err) = self.sweep_category(category) {
            tracing::warn!("Sweep of category '{}' failed: {}", category, err);
        }
    }

    /// Re-classify every active listing in a category against a fresh
    /// reference price.
    ///
    /// The reference comes from one consistent snapshot; each listing is
    /// then settled in its own small retried transaction (listing plus its
    /// seller when the flag moves), so one conflicted listing never blocks
    /// the rest. Failures are collected, not propagated.
    fn sweep_category(&self, category: &str) -> EngineResult<CategorySweep> {
        let sample = self.store.active_products_in_category(category)?;
        let prices: Vec<u64> = sample.iter().map(Product::price).collect();
        let reference = match reference_price(&prices, &self.policy.pricing) {
            Ok(reference) => Some(reference),
            Err(DomainError::InsufficientData(_)) => None,
            Err(err) => return Err(err.into()),
        };

        let mut sweep = CategorySweep {
            category: category.to_string(),
            reference_price: reference,
            examined: sample.len(),
            reclassified: Vec::new(),
            failed: Vec::new(),
        };

        for listed in &sample {
            let product_id = listed.id_typed();
            match self.settle_swept_product(product_id, category, reference) {
                Ok(true) => sweep.reclassified.push(product_id),
                Ok(false) => {}
                Err(err) => sweep.failed.push(SweepFailure {
                    product_id,
                    error: err.to_string(),
                }),
            }
        }

        tracing::info!(
            "Swept category '{}': {} examined, {} reclassified, {} failed",
            category,
            sweep.examined,
            sweep.reclassified.len(),
            sweep.failed.len()
        );
        Ok(sweep)
    }

    /// Apply a sweep's reference to one listing; returns whether anything
    /// moved. Skips listings that vanished, moved category, or went inactive
    /// since the snapshot.
    fn settle_swept_product(
        &self,
        product_id: ProductId,
        category: &str,
        reference: Option<u64>,
    ) -> EngineResult<bool> {
        self.commit_with_retries(|| {
            let Some(mut product) = self.store.product(product_id)? else {
                return Ok((Transaction::new(), false));
            };
            if !product.is_active() || product.category() != category {
                return Ok((Transaction::new(), false));
            }

            let assessment = assess(product.price(), reference, &self.policy.pricing);
            if assessment.flag == product.price_flag()
                && assessment.recommended_price == product.recommended_price()
            {
                return Ok((Transaction::new(), false));
            }

            let flag_moved = assessment.flag != product.price_flag();
            product.apply_assessment(assessment);

            let mut transaction = Transaction::new();
            // A flag change moves the seller's suspicious count, so the
            // trust refresh rides in the same batch.
            if flag_moved {
                let mut seller = self.require_seller(product.seller_id())?;
                self.refresh_seller(&mut seller, slice::from_ref(&product), None)?;
                transaction.put(seller);
            }
            transaction.put(product);
            Ok((transaction, true))
        })
    }
}
