//! # Reference Resolver
//!
//! Turns reference blocks into CF GUIDs before a resource is reconciled.
//!
//! Resolution order, first non-empty wins:
//! 1. an explicit GUID field
//! 2. a named resource of the referenced kind (its external name)
//! 3. a label selector matching exactly one resource
//! 4. a plain CF name resolved through the provider
//!
//! Targets that exist but have no external name yet, or do not exist at
//! all, are pending: the tick re-queues without an error. An ambiguous
//! selector is an error.

use crate::crd::{Managed, OrgReference, Organization, Reference, Selector, Space, SpaceReference};
use crate::error::{Error, Result};
use crate::provider::NameLookup;
use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Organization,
    Space,
}

impl RefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "Organization",
            Self::Space => "Space",
        }
    }
}

/// A referenced managed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedResource {
    pub name: String,
    pub external_name: Option<String>,
}

/// Lookup of managed resources by name or labels
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn get(&self, kind: RefKind, name: &str) -> Result<Option<ReferencedResource>>;
    async fn select(&self, kind: RefKind, selector: &Selector) -> Result<Vec<ReferencedResource>>;
}

/// Outcome of resolving one reference block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// `persist` is false for GUIDs that must not be written back to the spec
    Guid { guid: String, persist: bool },
    Pending(String),
    /// The block names nothing
    Unset,
}

pub struct Resolver<'a> {
    store: &'a dyn ReferenceStore,
    names: &'a dyn NameLookup,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn ReferenceStore, names: &'a dyn NameLookup) -> Self {
        Self { store, names }
    }

    /// External name of a named resource
    pub async fn resolve_named(&self, kind: RefKind, reference: &Reference) -> Result<Resolved> {
        let resolved = match self.store.get(kind, &reference.name).await? {
            None => Resolved::Pending(format!("{} {} not found", kind.as_str(), reference.name)),
            Some(ReferencedResource {
                external_name: None,
                ..
            }) => Resolved::Pending(format!(
                "{} {} has no external name yet",
                kind.as_str(),
                reference.name
            )),
            Some(ReferencedResource {
                external_name: Some(guid),
                ..
            }) => Resolved::Guid {
                guid,
                persist: true,
            },
        };
        Ok(resolved)
    }

    pub async fn resolve_selector(&self, kind: RefKind, selector: &Selector) -> Result<Resolved> {
        let matches = self.store.select(kind, selector).await?;
        match matches.as_slice() {
            [] => Ok(Resolved::Pending(format!(
                "no {} matches selector {}",
                kind.as_str(),
                selector
            ))),
            [only] => match &only.external_name {
                Some(guid) => Ok(Resolved::Guid {
                    guid: guid.clone(),
                    persist: true,
                }),
                None => Ok(Resolved::Pending(format!(
                    "{} {} has no external name yet",
                    kind.as_str(),
                    only.name
                ))),
            },
            many => Err(Error::reference(format!(
                "selector {} matches {} {} resources, expected exactly one",
                selector,
                many.len(),
                kind.as_str()
            ))
            .with("kind", kind.as_str())
            .with("selector", selector)
            .with("matches", many.len())),
        }
    }

    pub async fn resolve_org(&self, org: &OrgReference) -> Result<Resolved> {
        if let Some(guid) = org.org.as_ref().filter(|g| !g.is_empty()) {
            return Ok(Resolved::Guid {
                guid: guid.clone(),
                persist: false,
            });
        }
        if let Some(reference) = &org.org_ref {
            return self.resolve_named(RefKind::Organization, reference).await;
        }
        if let Some(selector) = &org.org_selector {
            return self.resolve_selector(RefKind::Organization, selector).await;
        }
        if let Some(name) = &org.org_name {
            debug!("Resolving organization by name {}", name);
            return Ok(match self.names.org_guid_by_name(name).await? {
                Some(guid) => Resolved::Guid {
                    guid,
                    persist: false,
                },
                None => Resolved::Pending(format!("organization named {name} not found")),
            });
        }
        Ok(Resolved::Unset)
    }

    pub async fn resolve_space(&self, space: &SpaceReference) -> Result<Resolved> {
        if let Some(guid) = space.space.as_ref().filter(|g| !g.is_empty()) {
            return Ok(Resolved::Guid {
                guid: guid.clone(),
                persist: false,
            });
        }
        if let Some(reference) = &space.space_ref {
            return self.resolve_named(RefKind::Space, reference).await;
        }
        if let Some(selector) = &space.space_selector {
            return self.resolve_selector(RefKind::Space, selector).await;
        }
        if let (Some(space_name), Some(org_name)) = (&space.space_name, &space.org_name) {
            debug!("Resolving space by name {}/{}", org_name, space_name);
            return Ok(
                match self.names.space_guid_by_name(org_name, space_name).await? {
                    Some(guid) => Resolved::Guid {
                        guid,
                        persist: false,
                    },
                    None => Resolved::Pending(format!(
                        "space named {space_name} in organization {org_name} not found"
                    )),
                },
            );
        }
        Ok(Resolved::Unset)
    }
}

/// [`ReferenceStore`] over the cluster's managed resources
#[derive(Clone)]
pub struct KubeReferenceStore {
    client: Client,
}

impl KubeReferenceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_kind<K: Managed>(&self, name: &str) -> Result<Option<ReferencedResource>> {
        let api: Api<K> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.map(|r| referenced(&r)))
    }

    async fn select_kind<K: Managed>(&self, selector: &Selector) -> Result<Vec<ReferencedResource>> {
        let api: Api<K> = Api::all(self.client.clone());
        let params = ListParams::default().labels(&selector.to_string());
        Ok(api.list(&params).await?.items.iter().map(referenced).collect())
    }
}

fn referenced<K: Managed>(resource: &K) -> ReferencedResource {
    ReferencedResource {
        name: resource.name_any(),
        external_name: resource.external_name().map(str::to_string),
    }
}

#[async_trait]
impl ReferenceStore for KubeReferenceStore {
    async fn get(&self, kind: RefKind, name: &str) -> Result<Option<ReferencedResource>> {
        match kind {
            RefKind::Organization => self.get_kind::<Organization>(name).await,
            RefKind::Space => self.get_kind::<Space>(name).await,
        }
    }

    async fn select(&self, kind: RefKind, selector: &Selector) -> Result<Vec<ReferencedResource>> {
        match kind {
            RefKind::Organization => self.select_kind::<Organization>(selector).await,
            RefKind::Space => self.select_kind::<Space>(selector).await,
        }
    }
}
