//! # Reconcile Timing Configuration
//!
//! Re-queue intervals, error back-off and worker concurrency. Durations use
//! the Kubernetes duration syntax (`10s`, `5m`, `1h`).

use super::env_var_or_default;
use crate::constants::*;
use crate::controller::validation::parse_kubernetes_duration;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Re-queue while an operation classifies running
    pub requeue_in_flight: Duration,
    /// Steady-state poll interval
    pub requeue_steady: Duration,
    /// Re-queue when a referenced resource has no external id yet
    pub requeue_pending_reference: Duration,
    /// First step of the per-resource error back-off
    pub error_backoff_base: Duration,
    /// Cap of the per-resource error back-off
    pub error_backoff_max: Duration,
    /// Deadline for synchronous job polling during delete
    pub job_poll_deadline: Duration,
    /// Concurrent reconciles per managed kind
    pub worker_concurrency: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_in_flight: Duration::from_secs(DEFAULT_REQUEUE_IN_FLIGHT_SECS),
            requeue_steady: Duration::from_secs(DEFAULT_REQUEUE_STEADY_SECS),
            requeue_pending_reference: Duration::from_secs(DEFAULT_REQUEUE_PENDING_REFERENCE_SECS),
            error_backoff_base: Duration::from_secs(DEFAULT_ERROR_BACKOFF_BASE_SECS),
            error_backoff_max: Duration::from_secs(DEFAULT_ERROR_BACKOFF_MAX_SECS),
            job_poll_deadline: Duration::from_secs(DEFAULT_JOB_POLL_DEADLINE_SECS),
            worker_concurrency: DEFAULT_WORKER_CONCURRENCY,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            requeue_in_flight: duration_var("REQUEUE_IN_FLIGHT", defaults.requeue_in_flight),
            requeue_steady: duration_var("REQUEUE_STEADY", defaults.requeue_steady),
            requeue_pending_reference: duration_var(
                "REQUEUE_PENDING_REFERENCE",
                defaults.requeue_pending_reference,
            ),
            error_backoff_base: defaults.error_backoff_base,
            error_backoff_max: duration_var("ERROR_BACKOFF_MAX", defaults.error_backoff_max),
            job_poll_deadline: duration_var("JOB_POLL_DEADLINE", defaults.job_poll_deadline),
            worker_concurrency: env_var_or_default(
                "WORKER_CONCURRENCY",
                defaults.worker_concurrency,
            )
            .max(1),
        }
    }
}

/// Parse a duration variable, falling back to the default on absence or error
fn duration_var(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(value) => parse_kubernetes_duration(&value).unwrap_or_else(|e| {
            warn!("Ignoring {}={:?}: {}", key, value, e);
            default
        }),
        Err(_) => default,
    }
}
