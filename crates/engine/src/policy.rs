use serde::{Deserialize, Serialize};

use fairmarket_catalog::PricePolicy;
use fairmarket_sellers::{StatusPolicy, TrustPolicy};

/// Tunable behavior of the engine: the three domain policies plus the
/// orchestration knobs.
///
/// Policies are plain data, set at construction. The defaults are the
/// production values; tests tighten or loosen individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnginePolicy {
    pub trust: TrustPolicy,
    pub status: StatusPolicy,
    pub pricing: PricePolicy,
    /// Minimum seconds between full sweeps of any one category. `0` sweeps
    /// on every trigger.
    pub sweep_debounce_secs: u64,
    /// Bounded retries when an optimistic write conflicts; each retry
    /// re-reads and recomputes.
    pub write_retries: u32,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            trust: TrustPolicy::default(),
            status: StatusPolicy::default(),
            pricing: PricePolicy::default(),
            sweep_debounce_secs: 300,
            write_retries: 3,
        }
    }
}
