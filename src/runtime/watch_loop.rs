//! # Watch Loop
//!
//! One `kube-runtime` controller per managed kind, all sharing the same
//! [`Reconciler`] context. The loop returns once every controller has shut
//! down after SIGTERM or SIGINT.

use crate::controller::managed::ManagedKind;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::{Domain, Mta, OrgQuota, Organization, Space, SpaceMembers};
use crate::runtime::error_policy::{handle_reconciliation_error, log_controller_error};
use anyhow::Result;
use futures::StreamExt;
use kube::api::Api;
use kube::Client;
use kube_runtime::controller::{Config as RuntimeConfig, Controller};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Run every managed-kind controller until shutdown
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    info!(
        "Starting controllers with {} workers per kind",
        reconciler.config.worker_concurrency
    );

    futures::join!(
        run_controller::<Organization>(client.clone(), reconciler.clone()),
        run_controller::<Space>(client.clone(), reconciler.clone()),
        run_controller::<Domain>(client.clone(), reconciler.clone()),
        run_controller::<OrgQuota>(client.clone(), reconciler.clone()),
        run_controller::<SpaceMembers>(client.clone(), reconciler.clone()),
        run_controller::<Mta>(client, reconciler),
    );

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("All controllers stopped");
    Ok(())
}

async fn run_controller<K: ManagedKind>(client: Client, reconciler: Arc<Reconciler>) {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = Api::all(client);
    let config = RuntimeConfig::default().concurrency(reconciler.config.worker_concurrency);

    info!("Watching {} resources", kind);
    Controller::new(api, WatcherConfig::default())
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile::<K>, handle_reconciliation_error::<K>, reconciler)
        .for_each(|result| {
            let kind = kind.clone();
            async move {
                match result {
                    Ok((obj, action)) => debug!("{} {} reconciled: {:?}", kind, obj.name, action),
                    Err(e) => log_controller_error(&kind, &e),
                }
            }
        })
        .await;
    info!("{} controller stopped", kind);
}
