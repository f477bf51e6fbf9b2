//! # Secret Access
//!
//! Reads Kubernetes Secrets for provider credentials and archive download
//! credentials. Secret bytes are wiped when dropped.

use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use std::collections::BTreeMap;
use zeroize::Zeroize;

/// Secret payload and the version it was read at
#[derive(Clone, Default)]
pub struct SecretData {
    pub resource_version: Option<String>,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl SecretData {
    /// Value of `key` as UTF-8
    pub fn string(&self, key: &str) -> Result<String> {
        let bytes = self
            .data
            .get(key)
            .ok_or_else(|| Error::validation(format!("secret has no key '{key}'")).with("key", key))?;
        String::from_utf8(bytes.clone())
            .map_err(|_| Error::validation(format!("secret key '{key}' is not valid UTF-8")).with("key", key))
    }
}

impl Drop for SecretData {
    fn drop(&mut self) {
        for value in self.data.values_mut() {
            value.zeroize();
        }
    }
}

impl std::fmt::Debug for SecretData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretData")
            .field("resource_version", &self.resource_version)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
pub trait SecretReader: Send + Sync {
    /// `None` when the Secret does not exist
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretData>>;
}

/// Read a Secret that must exist
///
/// A missing Secret is reported as an unresolvable reference so the
/// resource is retried once it appears.
pub async fn require_secret(
    reader: &dyn SecretReader,
    namespace: &str,
    name: &str,
) -> Result<SecretData> {
    reader.read_secret(namespace, name).await?.ok_or_else(|| {
        Error::reference(format!("secret {namespace}/{name} not found"))
            .with("secret", format!("{namespace}/{name}"))
    })
}

#[derive(Clone)]
pub struct KubeSecretReader {
    client: Client,
}

impl KubeSecretReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretReader for KubeSecretReader {
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretData>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let Some(secret) = api.get_opt(name).await? else {
            return Ok(None);
        };
        let data = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect();
        Ok(Some(SecretData {
            resource_version: secret.metadata.resource_version,
            data,
        }))
    }
}
