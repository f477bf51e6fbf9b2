//! # Custom Resource Definitions
//!
//! CRD types for the Cloud Foundry provider.
//!
//! Every managed kind follows the same shape: `spec.forProvider` with the
//! desired attributes, optional `spec.initProvider`, `spec.managementPolicies`
//! and `spec.providerConfigRef`; `status.atProvider` with the last observation
//! and `status.conditions`. All kinds are cluster-scoped and listed under the
//! `crossplane`, `managed` and `cloudfoundry` categories.

use crate::constants::{DEFAULT_PROVIDER_CONFIG, EXTERNAL_NAME_ANNOTATION};
use crate::controller::drift::FillUnset;
use kube::core::ClusterResourceScope;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

pub mod domain;
pub mod mta;
pub mod org_quota;
pub mod organization;
pub mod provider;
pub mod space;
pub mod space_members;
pub mod status;

pub use domain::*;
pub use mta::*;
pub use org_quota::*;
pub use organization::*;
pub use provider::*;
pub use space::*;
pub use space_members::*;
pub use status::*;

/// Action a management policy may grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum ManagementAction {
    Observe,
    Create,
    Update,
    Delete,
    LateInitialize,
    /// Every action
    #[serde(rename = "*")]
    All,
}

/// Set of actions the controller may take on the external resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ManagementPolicies(pub Vec<ManagementAction>);

impl Default for ManagementPolicies {
    fn default() -> Self {
        Self(vec![ManagementAction::All])
    }
}

impl ManagementPolicies {
    pub fn allows(&self, action: ManagementAction) -> bool {
        self.0
            .iter()
            .any(|a| *a == ManagementAction::All || *a == action)
    }
}

/// Reference to the `ProviderConfig` holding API endpoint and credentials
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ProviderConfigReference {
    #[serde(default = "default_provider_config")]
    pub name: String,
}

fn default_provider_config() -> String {
    DEFAULT_PROVIDER_CONFIG.to_string()
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: default_provider_config(),
        }
    }
}

/// Reference to another managed resource by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Reference {
    pub name: String,
}

/// Label selector over managed resources of one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        f.write_str(&labels.join(","))
    }
}

/// Reference to a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SecretReference {
    pub namespace: String,
    pub name: String,
}

/// Reference to one key of a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SecretKeySelector {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// Organization reference block
///
/// Resolved in order: `org` GUID, `orgRef`, `orgSelector`, `orgName`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgReference {
    /// Organization GUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// Name of an `Organization` resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_ref: Option<Reference>,
    /// Selects exactly one `Organization` resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_selector: Option<Selector>,
    /// Organization name in Cloud Foundry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
}

impl OrgReference {
    pub fn is_empty(&self) -> bool {
        self.org.is_none()
            && self.org_ref.is_none()
            && self.org_selector.is_none()
            && self.org_name.is_none()
    }
}

/// Space reference block
///
/// Resolved in order: `space` GUID, `spaceRef`, `spaceSelector`,
/// `spaceName` + `orgName`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpaceReference {
    /// Space GUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    /// Name of a `Space` resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_ref: Option<Reference>,
    /// Selects exactly one `Space` resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_selector: Option<Selector>,
    /// Space name in Cloud Foundry, qualified by `orgName`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
}

/// Accessors shared by every managed kind
pub trait Managed:
    kube::Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Parameters: Clone + Debug + PartialEq + Serialize + FillUnset + Send + Sync;
    type Observation: Clone + Debug + Default + PartialEq + Serialize + Send + Sync;

    fn for_provider(&self) -> &Self::Parameters;
    fn for_provider_mut(&mut self) -> &mut Self::Parameters;
    fn init_provider(&self) -> Option<&Self::Parameters>;
    fn management_policies(&self) -> &ManagementPolicies;
    fn provider_config_ref(&self) -> &ProviderConfigReference;
    fn managed_status(&self) -> Option<&ManagedStatus<Self::Observation>>;
    fn managed_status_mut(&mut self) -> &mut ManagedStatus<Self::Observation>;

    fn at_provider(&self) -> Option<&Self::Observation> {
        self.managed_status().map(|s| &s.at_provider)
    }

    fn at_provider_mut(&mut self) -> &mut Self::Observation {
        &mut self.managed_status_mut().at_provider
    }

    /// External name annotation, `None` when absent or empty
    fn external_name(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|a| a.get(EXTERNAL_NAME_ANNOTATION))
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }

    fn set_external_name(&mut self, name: Option<&str>) {
        let annotations = self.meta_mut().annotations.get_or_insert_with(BTreeMap::new);
        match name {
            Some(name) => {
                annotations.insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string());
            }
            None => {
                annotations.remove(EXTERNAL_NAME_ANNOTATION);
            }
        }
    }
}

/// Implement [`Managed`] for a kind whose spec and status follow the common shape
macro_rules! managed_kind {
    ($kind:ty, $params:ty, $observation:ty) => {
        impl $crate::crd::Managed for $kind {
            type Parameters = $params;
            type Observation = $observation;

            fn for_provider(&self) -> &Self::Parameters {
                &self.spec.for_provider
            }

            fn for_provider_mut(&mut self) -> &mut Self::Parameters {
                &mut self.spec.for_provider
            }

            fn init_provider(&self) -> Option<&Self::Parameters> {
                self.spec.init_provider.as_ref()
            }

            fn management_policies(&self) -> &$crate::crd::ManagementPolicies {
                &self.spec.management_policies
            }

            fn provider_config_ref(&self) -> &$crate::crd::ProviderConfigReference {
                &self.spec.provider_config_ref
            }

            fn managed_status(
                &self,
            ) -> Option<&$crate::crd::ManagedStatus<Self::Observation>> {
                self.status.as_ref()
            }

            fn managed_status_mut(
                &mut self,
            ) -> &mut $crate::crd::ManagedStatus<Self::Observation> {
                self.status.get_or_insert_with(Default::default)
            }
        }
    };
}

pub(crate) use managed_kind;
