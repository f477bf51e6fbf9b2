//! # Managed Resource Seam
//!
//! The generic reconcile loop drives every kind through [`ExternalClient`];
//! each kind supplies one implementation that speaks to Cloud Foundry.

use crate::controller::resolver::Resolver;
use crate::controller::secrets::SecretReader;
use crate::crd::Managed;
use crate::error::Result;
use crate::provider::Providers;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What observing the external resource found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    /// Some asynchronous operation still classifies running
    pub in_flight: bool,
    /// Authoritative external identifier when known
    pub external_name: Option<String>,
}

impl ExternalObservation {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn present(external_name: impl Into<String>, up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            in_flight: false,
            external_name: Some(external_name.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    /// External name to record, when the create produced one
    pub external_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    /// A dependency has no external id yet
    Pending(String),
}

/// Parameters during reference resolution
///
/// `persisted` is written back to the resource spec; `working` is what the
/// rest of the tick uses and additionally carries GUIDs resolved from plain
/// CF names, which are kept for this tick only.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams<P> {
    pub persisted: P,
    pub working: P,
}

impl<P: Clone> ResolvedParams<P> {
    pub fn new(params: P) -> Self {
        Self {
            persisted: params.clone(),
            working: params,
        }
    }

    /// Apply `write` to the working copy, and to the persisted copy when `persist`
    pub fn write(&mut self, persist: bool, write: impl Fn(&mut P)) {
        write(&mut self.working);
        if persist {
            write(&mut self.persisted);
        }
    }
}

#[async_trait]
pub trait ExternalClient<K: Managed>: Send + Sync {
    /// Fill GUID fields from reference blocks
    async fn resolve_references(
        &self,
        _resolver: &Resolver<'_>,
        _params: &mut ResolvedParams<K::Parameters>,
    ) -> Result<Resolution> {
        Ok(Resolution::Resolved)
    }

    /// Read the external resource and refresh `status.atProvider`
    async fn observe(&self, resource: &mut K) -> Result<ExternalObservation>;

    /// Copy observed values into unset parameters; returns whether any changed
    fn late_initialize(&self, _params: &mut K::Parameters, _observed: &K::Observation) -> bool {
        false
    }

    async fn create(&self, resource: &mut K) -> Result<ExternalCreation>;

    async fn update(&self, resource: &mut K) -> Result<()>;

    /// Delete and wait for the deletion to complete
    async fn delete(&self, resource: &mut K) -> Result<()>;
}

/// What a kind's external client is built from
#[derive(Clone)]
pub struct ClientDeps {
    pub providers: Providers,
    pub secrets: Arc<dyn SecretReader>,
    pub job_poll_deadline: Duration,
}

/// A managed kind the generic loop can drive
pub trait ManagedKind: Managed {
    fn validate(params: &Self::Parameters) -> Result<()>;
    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>>;
}
