//! # ProviderConfig
//!
//! Cloud Foundry API endpoint and credentials shared by managed resources.

use super::SecretKeySelector;
use crate::error::{Error, Result};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   apiEndpoint: https://api.cf.eu10.hana.ondemand.com
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: cf-credentials
///       key: credentials
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    category = "crossplane",
    category = "provider",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Endpoint", "type":"string", "jsonPath":".spec.apiEndpoint"}, {"name":"Secret", "type":"string", "jsonPath":".spec.credentials.secretRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// CF API root, e.g. `https://api.cf.example.com`
    pub api_endpoint: String,
    /// Deploy-service root; derived from `apiEndpoint` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_ssl_validation: Option<bool>,
    pub credentials: ProviderCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    #[serde(default = "default_source")]
    pub source: String,
    /// Secret key holding `{"email": "...", "password": "..."}`
    pub secret_ref: SecretKeySelector,
}

fn default_source() -> String {
    "Secret".to_string()
}

impl ProviderConfigSpec {
    /// Deploy-service URL, explicit or derived by replacing the `api.` host label
    pub fn deploy_service_url(&self) -> Result<String> {
        if let Some(url) = &self.deploy_service_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let mut url = reqwest::Url::parse(&self.api_endpoint)
            .map_err(|e| Error::validation(format!("invalid apiEndpoint: {e}")))?;
        let host = url
            .host_str()
            .and_then(|h| h.strip_prefix("api."))
            .map(|rest| format!("deploy-service.{rest}"))
            .ok_or_else(|| {
                Error::validation(format!(
                    "cannot derive deployServiceUrl from apiEndpoint {}; set it explicitly",
                    self.api_endpoint
                ))
            })?;
        url.set_host(Some(&host))
            .map_err(|e| Error::validation(format!("invalid deploy-service host: {e}")))?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}
