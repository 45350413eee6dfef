//! Process-wide tracing setup shared by binaries and long-running tests.
//!
//! The engine and domain crates only emit through the `tracing` macros;
//! installing a subscriber is the embedding process's job, and this crate
//! is the one place that knows how to do it.

use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::EnvFilter;

/// Install the global JSON log subscriber.
///
/// Filter directives come from `RUST_LOG`, defaulting to `info`. Repeated
/// calls are no-ops, so tests and embedding binaries can call this
/// unconditionally.
pub fn init() {
    init_with_default("info");
}

/// Same as [`init`], with an explicit fallback filter for processes that
/// want a different baseline than `info`.
pub fn init_with_default(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(SystemTime)
        .with_current_span(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn repeated_init_is_a_no_op() {
        super::init();
        super::init_with_default("debug");
    }
}
