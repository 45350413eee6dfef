//! Category sweep reporting and the per-category debounce clock.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use fairmarket_core::ProductId;

/// One product the sweep could not update; the batch carries on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub product_id: ProductId,
    pub error: String,
}

/// Summary of one category sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySweep {
    pub category: String,
    /// The reference the sweep classified against; `None` when the category
    /// was too thin and flags were degraded instead.
    pub reference_price: Option<u64>,
    /// Active listings examined.
    pub examined: usize,
    /// Listings whose flag or recommendation actually moved.
    pub reclassified: Vec<ProductId>,
    /// Isolated per-product failures.
    pub failed: Vec<SweepFailure>,
}

/// Per-category debounce clock for full sweeps.
///
/// A sweep of a category may begin at most once per window; the triggering
/// product itself is always settled synchronously, so debouncing only delays
/// the re-classification of its neighbors.
#[derive(Debug, Default)]
pub(crate) struct SweepSchedule {
    last_run: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SweepSchedule {
    /// Whether a sweep of `category` may begin now. Records the run when it
    /// may, so the next call inside the window returns false.
    pub(crate) fn try_begin(&self, category: &str, now: DateTime<Utc>, debounce: Duration) -> bool {
        let mut last_run = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        let due = match last_run.get(category) {
            Some(last) => now - *last >= debounce,
            None => true,
        };
        if due {
            last_run.insert(category.to_string(), now);
        }
        due
    }

    /// Record a forced run so the debounce window restarts behind it.
    pub(crate) fn record(&self, category: &str, now: DateTime<Utc>) {
        let mut last_run = self.last_run.lock().unwrap_or_else(PoisonError::into_inner);
        last_run.insert(category.to_string(), now);
    }
}
