//! # Organization
//!
//! A Cloud Foundry organization.

use super::{ManagedStatus, ManagementPolicies, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Organization Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Organization
/// metadata:
///   name: acme
/// spec:
///   forProvider:
///     name: acme
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Organization",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    status = "OrganizationStatus",
    category = "crossplane",
    category = "managed",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSpec {
    pub for_provider: OrganizationParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_provider: Option<OrganizationParameters>,
    #[serde(default)]
    pub management_policies: ManagementPolicies,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationParameters {
    /// Organization name
    #[serde(default)]
    pub name: String,
    /// Whether the organization is suspended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

pub type OrganizationStatus = ManagedStatus<OrganizationObservation>;

super::managed_kind!(Organization, OrganizationParameters, OrganizationObservation);
