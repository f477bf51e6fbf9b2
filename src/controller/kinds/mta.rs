//! Mta external client, delegating to the deploy state machine.

use super::{apply_resolved, resolved_guid};
use crate::controller::drift::{fill_option, fill_vec, FillUnset};
use crate::controller::managed::{
    ClientDeps, ExternalClient, ExternalCreation, ExternalObservation, ManagedKind, Resolution,
    ResolvedParams,
};
use crate::controller::mta::machine::external_observation;
use crate::controller::mta::{MtaMachine, Phase};
use crate::controller::resolver::Resolver;
use crate::controller::secrets::SecretReader;
use crate::controller::validation::validate_mta;
use crate::crd::{Managed, Mta, MtaObservation, MtaParameters};
use crate::error::Result;
use crate::observability::metrics;
use crate::provider::MtaApi;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

impl FillUnset for MtaParameters {
    fn fill_unset(&mut self, from: &Self) {
        fill_option(&mut self.space.space, &from.space.space);
        fill_option(&mut self.namespace, &from.namespace);
        fill_option(&mut self.file, &from.file);
        fill_vec(&mut self.files, &from.files);
        fill_option(&mut self.extension, &from.extension);
        fill_option(&mut self.modules, &from.modules);
    }
}

impl ManagedKind for Mta {
    fn validate(params: &Self::Parameters) -> Result<()> {
        validate_mta(params)
    }

    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>> {
        Box::new(MtaClient {
            api: deps.providers.mta,
            secrets: deps.secrets,
            deadline: deps.job_poll_deadline,
        })
    }
}

struct MtaClient {
    api: Arc<dyn MtaApi>,
    secrets: Arc<dyn SecretReader>,
    deadline: Duration,
}

impl MtaClient {
    fn machine<'a>(&'a self, space: &'a str) -> MtaMachine<'a> {
        MtaMachine::new(self.api.as_ref(), self.secrets.as_ref(), space)
    }

    /// Advance the pipeline, recording the phase transition it causes
    async fn advance(&self, resource: &mut Mta) -> Result<()> {
        let params = resource.for_provider().clone();
        let space = resolved_guid(params.space.space.as_ref(), "space")?.to_string();
        let name = resource.name_any();
        let obs = resource.at_provider_mut();
        let before = Phase::of(&params, obs);
        let result = self.machine(&space).advance(&params, obs).await;
        record_transition(&name, before, Phase::of(&params, obs));
        result.map(|_| ())
    }
}

fn record_transition(name: &str, before: Phase, after: Phase) {
    if before != after {
        info!("MTA {} moved from {} to {}", name, before.as_str(), after.as_str());
        metrics::increment_mta_phase_transition(before.as_str(), after.as_str());
    }
}

#[async_trait]
impl ExternalClient<Mta> for MtaClient {
    async fn resolve_references(
        &self,
        resolver: &Resolver<'_>,
        params: &mut ResolvedParams<MtaParameters>,
    ) -> Result<Resolution> {
        let resolved = resolver.resolve_space(&params.working.space).await?;
        Ok(apply_resolved(resolved, params, |p, guid| p.space.space = Some(guid)))
    }

    async fn observe(&self, resource: &mut Mta) -> Result<ExternalObservation> {
        let params = resource.for_provider().clone();
        let space = resolved_guid(params.space.space.as_ref(), "space")?.to_string();
        let name = resource.name_any();
        let obs: &mut MtaObservation = resource.at_provider_mut();
        let before = Phase::of(&params, obs);
        self.machine(&space).observe(&params, obs).await?;
        record_transition(&name, before, Phase::of(&params, obs));
        Ok(external_observation(&params, obs))
    }

    async fn create(&self, resource: &mut Mta) -> Result<ExternalCreation> {
        self.advance(resource).await?;
        Ok(ExternalCreation {
            external_name: resource.at_provider().and_then(|o| o.mta_id.clone()),
        })
    }

    async fn update(&self, resource: &mut Mta) -> Result<()> {
        self.advance(resource).await
    }

    async fn delete(&self, resource: &mut Mta) -> Result<()> {
        let params = resource.for_provider().clone();
        let space = resolved_guid(params.space.space.as_ref(), "space")?.to_string();
        let obs = resource.at_provider_mut();
        self.machine(&space).delete(&params, obs, self.deadline).await
    }
}
