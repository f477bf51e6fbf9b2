//! # Domain
//!
//! A shared or private (organization-scoped) domain. Domains are immutable
//! once created; only creation and deletion reach Cloud Foundry.

use super::{ManagedStatus, ManagementPolicies, OrgReference, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Domain",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    status = "DomainStatus",
    category = "crossplane",
    category = "managed",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    pub for_provider: DomainParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_provider: Option<DomainParameters>,
    #[serde(default)]
    pub management_policies: ManagementPolicies,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainParameters {
    /// Fully qualified domain name
    #[serde(default)]
    pub name: String,
    /// Internal domains are only reachable via container-to-container networking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,
    /// Owning organization of a private domain; omit for a shared domain
    #[serde(flatten)]
    pub org: OrgReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_guid: Option<String>,
}

pub type DomainStatus = ManagedStatus<DomainObservation>;

super::managed_kind!(Domain, DomainParameters, DomainObservation);
