//! # SpaceMembers
//!
//! Assignment of one space role to a list of users.
//!
//! With the `Lax` enforcement policy the listed members are ensured to hold
//! the role and other holders are left alone; `Strict` additionally revokes
//! the role from every holder not in the list.

use super::{ManagedStatus, ManagementPolicies, ProviderConfigReference, SpaceReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SpaceMembers Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: cloudfoundry.crossplane.io/v1alpha1
/// kind: SpaceMembers
/// metadata:
///   name: acme-dev-managers
/// spec:
///   forProvider:
///     spaceRef:
///       name: acme-dev
///     roleType: SpaceManager
///     enforcementPolicy: Strict
///     members:
///       - username: alice@example.com
///       - username: bob@example.com
///         origin: sap.ids
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "SpaceMembers",
    group = "cloudfoundry.crossplane.io",
    version = "v1alpha1",
    status = "SpaceMembersStatus",
    category = "crossplane",
    category = "managed",
    category = "cloudfoundry",
    printcolumn = r#"{"name":"Role", "type":"string", "jsonPath":".spec.forProvider.roleType"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SpaceMembersSpec {
    pub for_provider: SpaceMembersParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_provider: Option<SpaceMembersParameters>,
    #[serde(default)]
    pub management_policies: ManagementPolicies,
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
}

/// Space role granted to the members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum SpaceRoleType {
    #[default]
    SpaceDeveloper,
    SpaceManager,
    SpaceAuditor,
    SpaceSupporter,
}

impl SpaceRoleType {
    /// CF v3 role type string
    pub fn as_cf_type(self) -> &'static str {
        match self {
            Self::SpaceDeveloper => "space_developer",
            Self::SpaceManager => "space_manager",
            Self::SpaceAuditor => "space_auditor",
            Self::SpaceSupporter => "space_supporter",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum EnforcementPolicy {
    #[default]
    Lax,
    Strict,
}

/// A user identified by username and identity provider origin
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Member {
    pub username: String,
    /// Identity provider; `uaa` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpaceMembersParameters {
    #[serde(flatten)]
    pub space: SpaceReference,
    #[serde(default)]
    pub role_type: SpaceRoleType,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub enforcement_policy: EnforcementPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpaceMembersObservation {
    /// Role GUID per normalized member key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assigned_roles: BTreeMap<String, String>,
}

pub type SpaceMembersStatus = ManagedStatus<SpaceMembersObservation>;

super::managed_kind!(SpaceMembers, SpaceMembersParameters, SpaceMembersObservation);
