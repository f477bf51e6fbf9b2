//! # Reconciler
//!
//! Entry point the watch loop calls for every managed kind. Wraps one
//! [`tick::run_tick`] with a tracing span, metrics and the mapping from the
//! tick outcome to a controller [`Action`].

pub mod store;
pub mod tick;

pub use store::{KubeResourceStore, ResourceStore};
pub use tick::{RequeueReason, TickContext, TickOutcome};

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::controller::managed::ManagedKind;
use crate::controller::resolver::ReferenceStore;
use crate::controller::secrets::SecretReader;
use crate::error::Error;
use crate::observability::metrics;
use crate::provider::Connector;
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn, Instrument};

/// Shared context of every managed-kind controller
pub struct Reconciler {
    pub client: Client,
    pub config: ControllerConfig,
    pub connector: Arc<dyn Connector>,
    pub references: Arc<dyn ReferenceStore>,
    pub secrets: Arc<dyn SecretReader>,
    /// Error back-off per `Kind/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        client: Client,
        config: ControllerConfig,
        connector: Arc<dyn Connector>,
        references: Arc<dyn ReferenceStore>,
        secrets: Arc<dyn SecretReader>,
    ) -> Self {
        Self {
            client,
            config,
            connector,
            references,
            secrets,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn backoff_key(kind: &str, name: &str) -> String {
        format!("{kind}/{name}")
    }

    fn reset_backoff(&self, key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }
}

/// Map a tick outcome to a controller action
pub fn outcome_action(outcome: &TickOutcome) -> Action {
    match outcome {
        TickOutcome::Requeue { after, reason } => {
            metrics::increment_requeues_total(reason.as_str());
            Action::requeue(*after)
        }
        TickOutcome::AwaitChange => Action::await_change(),
    }
}

/// Reconcile one managed resource
pub async fn reconcile<K: ManagedKind>(resource: Arc<K>, ctx: Arc<Reconciler>) -> Result<Action, Error> {
    let kind = K::kind(&()).to_string();
    let name = resource.name_any();
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = %kind,
        resource.name = %name,
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(&kind);

        let store = KubeResourceStore::<K>::new(ctx.client.clone());
        let tick_ctx = TickContext {
            connector: ctx.connector.as_ref(),
            references: ctx.references.as_ref(),
            secrets: ctx.secrets.clone(),
            store: &store,
            config: &ctx.config,
        };
        let result = tick::run_tick(&tick_ctx, resource.as_ref().clone()).await;
        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                ctx.reset_backoff(&Reconciler::backoff_key(&kind, &name));
                debug!("Tick finished: {:?}", outcome);
                Ok(outcome_action(&outcome))
            }
            Err(err) => {
                metrics::increment_reconciliation_errors(&kind, err.reason());
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}
