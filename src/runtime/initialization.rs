//! # Initialization
//!
//! Controller start-up: rustls setup, tracing, metrics, probe server and
//! the shared reconciler context.

use crate::config::{load_config, ServerConfig};
use crate::constants;
use crate::controller::reconciler::Reconciler;
use crate::controller::resolver::KubeReferenceStore;
use crate::controller::secrets::KubeSecretReader;
use crate::controller::server::{start_server, ServerState};
use crate::crd::{Domain, Mta, OrgQuota, Organization, ProviderConfig, Space, SpaceMembers};
use crate::observability;
use crate::provider::cache::{ClientCache, KubeProviderConfigs};
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// - rustls crypto provider
/// - tracing subscriber
/// - metrics registration and the probe server
/// - Kubernetes client and reconciler context
/// - a check that every CRD is installed
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| constants::DEFAULT_LOG_FILTER.into()),
        )
        .init();

    info!(
        "Starting Cloud Foundry provider controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (controller_config, server_config) = load_config();
    info!(
        requeue_in_flight = ?controller_config.requeue_in_flight,
        requeue_steady = ?controller_config.requeue_steady,
        error_backoff_max = ?controller_config.error_backoff_max,
        worker_concurrency = controller_config.worker_concurrency,
        "Loaded controller configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = server_state.clone();
    let port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let secrets = Arc::new(KubeSecretReader::new(client.clone()));
    let connector = Arc::new(ClientCache::new(
        Arc::new(KubeProviderConfigs::new(client.clone())),
        secrets.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        controller_config,
        connector,
        Arc::new(KubeReferenceStore::new(client.clone())),
        secrets,
    ));

    check_crds_installed(&client).await;

    info!("Controller initialized, starting watch loop...");
    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ServerConfig,
) -> Result<()> {
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > config.startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {:?}",
                config.startup_timeout
            ));
        }
        tokio::time::sleep(config.readiness_poll).await;
    }
}

/// Log how many resources of each kind exist, warning about missing CRDs
///
/// Controllers are started regardless; their watchers retry until the CRD
/// appears.
async fn check_crds_installed(client: &Client) {
    let span = tracing::info_span!("controller.startup.check_crds");
    let _guard = span.enter();

    count_resources::<ProviderConfig>(client).await;
    count_resources::<Organization>(client).await;
    count_resources::<Space>(client).await;
    count_resources::<Domain>(client).await;
    count_resources::<OrgQuota>(client).await;
    count_resources::<SpaceMembers>(client).await;
    count_resources::<Mta>(client).await;
}

async fn count_resources<K>(client: &Client)
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + std::fmt::Debug,
{
    let kind = K::kind(&());
    let api: Api<K> = Api::all(client.clone());
    match api.list_metadata(&ListParams::default()).await {
        Ok(list) => info!("Found {} existing {} resources", list.items.len(), kind),
        Err(e) => {
            error!("{} CRD is not queryable: {}. Is the CRD installed?", kind, e);
            warn!("Generate the CRDs with `crdgen | kubectl apply -f -`");
        }
    }
}
