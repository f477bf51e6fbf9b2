//! # Client Cache
//!
//! One [`CfClient`] per `ProviderConfig`, built lazily and shared by every
//! reconcile that names that config. An entry is rebuilt when the
//! ProviderConfig `generation` or the credentials Secret `resourceVersion`
//! differs from the one it was built from.

use super::cloudfoundry::auth::Credentials;
use super::cloudfoundry::{CfClient, Endpoints};
use super::{Connector, Providers};
use crate::controller::secrets::{require_secret, SecretReader};
use crate::crd::ProviderConfig;
use crate::error::{Error, Result};
use crate::observability::metrics::set_cached_clients;
use async_trait::async_trait;
use kube::api::Api;
use kube::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Source of `ProviderConfig` objects
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    async fn get_provider_config(&self, name: &str) -> Result<Option<ProviderConfig>>;
}

#[derive(Clone)]
pub struct KubeProviderConfigs {
    client: Client,
}

impl KubeProviderConfigs {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderConfigSource for KubeProviderConfigs {
    async fn get_provider_config(&self, name: &str) -> Result<Option<ProviderConfig>> {
        let api: Api<ProviderConfig> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }
}

/// JSON document stored under the credentials key
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
struct SecretCredentials {
    email: String,
    password: String,
}

/// Versions a cached client was built from
#[derive(Debug, Clone, PartialEq, Eq)]
struct BuiltFrom {
    generation: Option<i64>,
    secret_version: Option<String>,
}

struct CachedClient {
    built_from: BuiltFrom,
    providers: Providers,
}

/// [`Connector`] backed by a process-wide map of CF clients
pub struct ClientCache {
    configs: Arc<dyn ProviderConfigSource>,
    secrets: Arc<dyn SecretReader>,
    entries: Mutex<HashMap<String, CachedClient>>,
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache").finish_non_exhaustive()
    }
}

impl ClientCache {
    pub fn new(configs: Arc<dyn ProviderConfigSource>, secrets: Arc<dyn SecretReader>) -> Self {
        Self {
            configs,
            secrets,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached clients
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn parse_credentials(raw: &str, secret: &str) -> Result<Credentials> {
    let creds: SecretCredentials = serde_json::from_str(raw).map_err(|e| {
        Error::validation(format!(
            "credentials in {secret} must be JSON with email and password: {e}"
        ))
        .with("secret", secret)
    })?;
    Ok(Credentials {
        username: creds.email.clone(),
        password: creds.password.clone(),
    })
}

#[async_trait]
impl Connector for ClientCache {
    async fn connect(&self, provider_config: &str) -> Result<Providers> {
        let config = self
            .configs
            .get_provider_config(provider_config)
            .await?
            .ok_or_else(|| {
                Error::reference(format!("ProviderConfig {provider_config} not found"))
                    .with("providerConfig", provider_config)
            })?;
        let spec = &config.spec;
        if spec.credentials.source != "Secret" {
            return Err(Error::validation(format!(
                "unsupported credentials source {}",
                spec.credentials.source
            ))
            .with("providerConfig", provider_config));
        }

        let selector = &spec.credentials.secret_ref;
        let secret = require_secret(self.secrets.as_ref(), &selector.namespace, &selector.name).await?;
        let built_from = BuiltFrom {
            generation: config.metadata.generation,
            secret_version: secret.resource_version.clone(),
        };

        let mut entries = self.entries.lock().await;
        if let Some(cached) = entries.get(provider_config) {
            if cached.built_from == built_from {
                return Ok(cached.providers.clone());
            }
        }

        let secret_name = format!("{}/{}", selector.namespace, selector.name);
        let raw = zeroize::Zeroizing::new(secret.string(&selector.key)?);
        let credentials = parse_credentials(&raw, &secret_name)?;
        let endpoints = Endpoints {
            api: spec.api_endpoint.clone(),
            deploy_service: spec.deploy_service_url()?,
            skip_ssl_validation: spec.skip_ssl_validation.unwrap_or(false),
        };
        let client = CfClient::new(endpoints, credentials)?;
        let providers = Providers::from_client(Arc::new(client));

        let rebuilt = entries.contains_key(provider_config);
        entries.insert(
            provider_config.to_string(),
            CachedClient {
                built_from,
                providers: providers.clone(),
            },
        );
        set_cached_clients(entries.len());
        info!(
            "{} CF client for ProviderConfig {} ({})",
            if rebuilt { "Rebuilt" } else { "Built" },
            provider_config,
            spec.api_endpoint
        );
        Ok(providers)
    }
}
