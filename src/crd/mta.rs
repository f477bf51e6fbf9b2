//! # Mta
//!
//! A Multi-Target Application deployed through the CF deploy-service.
//!
//! The resource status doubles as the deploy pipeline's state: every upload
//! and deploy submission is recorded in `atProvider` as an [`Operation`]
//! before the tick returns, so a restarted controller resumes polling
//! exactly where the previous process stopped.

use super::{ManagedStatus, ManagementPolicies, ProviderConfigReference, SecretReference, SpaceReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mta Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Mta
/// metadata:
///   name: demo
/// spec:
///   forProvider:
///     spaceRef:
///       name: acme-dev
///     file:
///       url: https://artifacts.example.com/demo-1.0.0.mtar
///     extension: |
///       _schema-version: "3.1"
///       ID: demo-dev
///       extends: com.example.demo
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Mta",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    status = "MtaStatus",
    category = "crossplane",
    category = "managed",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"MTA-ID", "type":"string", "jsonPath":".status.atProvider.mtaId"}, {"name":"Operation", "type":"string", "jsonPath":".status.atProvider.lastOperation.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MtaSpec {
    pub for_provider: MtaParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_provider: Option<MtaParameters>,
    #[serde(default)]
    pub management_policies: ManagementPolicies,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
}

/// Archive location
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MtaFile {
    /// HTTP(S) URL the deploy-service downloads the archive from
    pub url: String,
    /// Secret with `username` and `password` keys for the archive host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SecretReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MtaParameters {
    #[serde(flatten)]
    pub space: SpaceReference,
    /// Deploy-service namespace prefixing the MTA's apps and services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<MtaFile>,
    /// Additional archive parts, uploaded after `file`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<MtaFile>,
    /// Inline extension descriptor (mtaext)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Subset of modules to deploy; all modules when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(default)]
    pub blue_green_deploy: bool,
    #[serde(default = "default_true")]
    pub abort_on_error: bool,
    #[serde(default)]
    pub delete_services: bool,
    /// One of `ALL`, `SAME_HIGHER`, `HIGHER`
    #[serde(default = "default_version_rule")]
    pub version_rule: String,
}

fn default_true() -> bool {
    true
}

fn default_version_rule() -> String {
    "SAME_HIGHER".to_string()
}

impl Default for MtaParameters {
    fn default() -> Self {
        Self {
            space: SpaceReference::default(),
            namespace: None,
            file: None,
            files: Vec::new(),
            extension: None,
            modules: None,
            blue_green_deploy: false,
            abort_on_error: default_true(),
            delete_services: false,
            version_rule: default_version_rule(),
        }
    }
}

impl MtaParameters {
    /// `file` followed by `files`, duplicates by URL removed
    pub fn all_files(&self) -> Vec<&MtaFile> {
        let mut out: Vec<&MtaFile> = Vec::new();
        for file in self.file.iter().chain(self.files.iter()) {
            if !out.iter().any(|f| f.url == file.url) {
                out.push(file);
            }
        }
        out
    }
}

/// An asynchronous CF operation as recorded in status
///
/// `state` is the provider's raw string; see
/// [`crate::controller::operation`] for its classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Operation {
    /// Freshly submitted operation
    pub fn running(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            state: Some(crate::controller::operation::STATE_RUNNING.to_string()),
            error: None,
        }
    }
}

/// One uploaded archive part
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileObservation {
    /// Deploy-service file id, set once the upload job finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    /// Instance affinity returned by the upload; replayed when polling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<Operation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MtaObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mta_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mta_extension_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mta_extension_hash: Option<String>,
    /// Modules applied by the last successful deploy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mta_modules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileObservation>,
    /// Last deploy or undeploy submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<Operation>,
    /// Fingerprint of the inputs of the last deploy submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mta_deployment_hash: Option<String>,
}

impl MtaObservation {
    /// First observation whose URL matches
    pub fn find_file(&self, url: &str) -> Option<&FileObservation> {
        self.files.iter().find(|f| f.url == url)
    }
}

pub type MtaStatus = ManagedStatus<MtaObservation>;

super::managed_kind!(Mta, MtaParameters, MtaObservation);
