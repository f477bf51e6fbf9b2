//! # Error Policy
//!
//! Error handling and back-off for the controller watch loops.

use crate::controller::backoff::BackoffState;
use crate::controller::managed::ManagedKind;
use crate::controller::reconciler::Reconciler;
use crate::error::Error;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handle a failed tick
///
/// Validation failures wait for the spec to change. Everything else is
/// retried with a per-resource exponential back-off, tracked per resource so
/// one failing resource never slows down another.
pub fn handle_reconciliation_error<K: ManagedKind>(
    obj: Arc<K>,
    error: &Error,
    ctx: Arc<Reconciler>,
) -> Action {
    let kind = K::kind(&()).to_string();
    let name = obj.name_any();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = %kind,
        resource.name = %name,
        error.reason = error.reason(),
        error.attributes = %error.attributes(),
    );
    let _error_guard = error_span.enter();

    if matches!(error, Error::Validation { .. }) {
        warn!("{} {} is invalid, waiting for a spec change: {}", kind, name, error);
        observability::metrics::increment_requeues_total("await-change");
        return Action::await_change();
    }

    error!("Reconciliation error for {} {}: {}", kind, name, error);

    let key = Reconciler::backoff_key(&kind, &name);
    let (delay, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(key).or_insert_with(|| {
                BackoffState::new(ctx.config.error_backoff_base, ctx.config.error_backoff_max)
            });
            state.increment_error();
            (state.backoff.next_backoff(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (ctx.config.error_backoff_base, 0)
        }
    };

    info!(
        "Retrying in {}s (error count: {}, trigger source: error-backoff)",
        delay.as_secs(),
        error_count
    );
    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Log an error surfaced by a controller stream
///
/// Reconcile failures were already handled by the error policy; watch errors
/// are retried by the watcher's own back-off.
pub fn log_controller_error<E: std::error::Error + 'static>(kind: &str, error: &kube_runtime::controller::Error<Error, E>) {
    use kube_runtime::controller::Error as ControllerError;
    match error {
        ControllerError::ReconcilerFailed(err, obj) => {
            info!("{} {} failed: {}", kind, obj.name, err.reason());
        }
        ControllerError::ObjectNotFound(obj) => {
            info!("{} {} no longer exists", kind, obj.name);
        }
        ControllerError::QueueError(err) => {
            let message = err.to_string();
            if message.contains("410") || message.contains("too old resource version") {
                warn!("{} watch resource version expired (410), watch will restart", kind);
            } else if message.contains("401") || message.contains("Unauthorized") {
                error!("{} watch authentication failed (401 Unauthorized): RBAC may have been revoked", kind);
            } else {
                warn!("{} controller stream error: {}", kind, message);
            }
        }
        other => warn!("{} controller error: {}", kind, other),
    }
}
