//! # OrgQuota
//!
//! An organization quota definition and the organizations it is applied to.

use super::{ManagedStatus, ManagementPolicies, ProviderConfigReference, Reference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OrgQuota Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: OrgQuota
/// metadata:
///   name: small
/// spec:
///   forProvider:
///     name: small
///     totalMemoryMb: 10240
///     totalRoutes: 50
///     orgsRefs:
///       - name: acme
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "OrgQuota",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    status = "OrgQuotaStatus",
    category = "crossplane",
    category = "managed",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaSpec {
    pub for_provider: OrgQuotaParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_provider: Option<OrgQuotaParameters>,
    #[serde(default)]
    pub management_policies: ManagementPolicies,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaParameters {
    #[serde(default)]
    pub name: String,
    /// Total memory across all app processes (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_memory_mb: Option<i64>,
    /// Maximum memory of a single process instance (MB)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_memory_mb: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_app_instances: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_routes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_service_instances: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_services_allowed: Option<bool>,
    /// Organization GUIDs the quota applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<String>,
    /// `Organization` resources the quota applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orgs_refs: Vec<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgQuotaObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_memory_mb: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_memory_mb: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_app_instances: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_routes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_service_instances: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_services_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orgs: Vec<String>,
}

pub type OrgQuotaStatus = ManagedStatus<OrgQuotaObservation>;

super::managed_kind!(OrgQuota, OrgQuotaParameters, OrgQuotaObservation);
