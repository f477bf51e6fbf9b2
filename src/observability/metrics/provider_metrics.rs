//! # Provider Metrics
//!
//! Metrics for Cloud Foundry, UAA and deploy-service requests.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, IntGauge};
use std::sync::LazyLock;

static PROVIDER_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cf_provider_api_requests_total",
            "Total number of provider API requests by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_REQUESTS_TOTAL metric - this should never happen")
});

static PROVIDER_REQUEST_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cf_provider_api_request_errors_total",
            "Total number of failed provider API requests by operation and error class",
        ),
        &["operation", "class"],
    )
    .expect("Failed to create PROVIDER_REQUEST_ERRORS_TOTAL metric - this should never happen")
});

static PROVIDER_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "cf_provider_api_request_duration_seconds",
            "Duration of provider API requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_REQUEST_DURATION metric - this should never happen")
});

static TOKEN_REFRESHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cf_provider_token_refreshes_total",
        "Total number of UAA access token requests",
    )
    .expect("Failed to create TOKEN_REFRESHES_TOTAL metric - this should never happen")
});

static CACHED_CLIENTS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "cf_provider_cached_clients",
        "Current number of cached provider clients",
    )
    .expect("Failed to create CACHED_CLIENTS metric - this should never happen")
});

/// Register provider metrics with the registry
pub(crate) fn register_provider_metrics() -> Result<()> {
    REGISTRY.register(Box::new(PROVIDER_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_REQUEST_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(TOKEN_REFRESHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CACHED_CLIENTS.clone()))?;
    Ok(())
}

pub fn increment_provider_requests(operation: &str) {
    PROVIDER_REQUESTS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_provider_request_errors(operation: &str, class: &str) {
    PROVIDER_REQUEST_ERRORS_TOTAL
        .with_label_values(&[operation, class])
        .inc();
}

pub fn observe_provider_request_duration(operation: &str, duration: f64) {
    PROVIDER_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_token_refreshes() {
    TOKEN_REFRESHES_TOTAL.inc();
}

pub fn set_cached_clients(count: usize) {
    CACHED_CLIENTS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_provider_requests() {
        let before = PROVIDER_REQUESTS_TOTAL
            .with_label_values(&["get_space"])
            .get();
        increment_provider_requests("get_space");
        let after = PROVIDER_REQUESTS_TOTAL
            .with_label_values(&["get_space"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_set_cached_clients() {
        set_cached_clients(3);
        assert_eq!(CACHED_CLIENTS.get(), 3);
    }
}
