//! # Space
//!
//! A Cloud Foundry space inside an organization.

use super::{ManagedStatus, ManagementPolicies, OrgReference, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Space Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: Space
/// metadata:
///   name: acme-dev
/// spec:
///   forProvider:
///     name: dev
///     orgRef:
///       name: acme
///     allowSsh: false
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Space",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    status = "SpaceStatus",
    category = "crossplane",
    category = "managed",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSpec {
    pub for_provider: SpaceParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_provider: Option<SpaceParameters>,
    #[serde(default)]
    pub management_policies: ManagementPolicies,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpaceParameters {
    /// Space name
    #[serde(default)]
    pub name: String,
    /// Owning organization
    #[serde(flatten)]
    pub org: OrgReference,
    /// Whether SSH into apps is allowed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpaceObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_ssh: Option<bool>,
}

pub type SpaceStatus = ManagedStatus<SpaceObservation>;

super::managed_kind!(Space, SpaceParameters, SpaceObservation);
