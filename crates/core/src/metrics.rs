//! Prometheus metrics for core components.
//!
//! Counters are process-wide statics; embedding consumers call
//! [`register_all`] against their registry to expose them.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Events processed across all scrape runs.
pub static EVENTS_PROCESSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stubhound_events_processed_total",
        "Total events processed by scrape runs",
    )
    .unwrap()
});

/// Seats emitted as canonical inventory rows.
pub static SEATS_FOUND: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stubhound_seats_found_total",
        "Total seats emitted as inventory rows",
    )
    .unwrap()
});

/// Marketplace request attempts by outcome.
pub static MARKETPLACE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stubhound_marketplace_requests_total",
            "Marketplace request attempts",
        ),
        &["result"], // "ok", "rejected", "transport_error"
    )
    .unwrap()
});

/// Header-fetch attempts by outcome.
pub static CREDENTIAL_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "stubhound_credential_fetches_total",
            "Header-fetch service calls",
        ),
        &["result"], // "ok", "rejected", "error"
    )
    .unwrap()
});

/// Credential bundles deactivated after repeated failures.
pub static CREDENTIALS_EVICTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stubhound_credentials_evicted_total",
        "Credential bundles deactivated after repeated failures",
    )
    .unwrap()
});

/// Register all core metrics with the given registry.
pub fn register_all(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(EVENTS_PROCESSED.clone()))?;
    registry.register(Box::new(SEATS_FOUND.clone()))?;
    registry.register(Box::new(MARKETPLACE_REQUESTS.clone()))?;
    registry.register(Box::new(CREDENTIAL_FETCHES.clone()))?;
    registry.register(Box::new(CREDENTIALS_EVICTED.clone()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all() {
        let registry = Registry::new();
        register_all(&registry).unwrap();
        assert!(!registry.gather().is_empty());
    }
}
