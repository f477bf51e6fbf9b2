//! Domain external client. CF does not allow changing a domain after
//! creation, so an existing domain is always reported up to date.

use super::{apply_resolved, await_deletion, external_guid};
use crate::controller::drift::{fill_option, fill_string, FillUnset};
use crate::controller::managed::{
    ClientDeps, ExternalClient, ExternalCreation, ExternalObservation, ManagedKind, Resolution,
    ResolvedParams,
};
use crate::controller::resolver::Resolver;
use crate::controller::validation::validate_domain;
use crate::crd::{Domain, DomainObservation, DomainParameters, Managed};
use crate::error::Result;
use crate::provider::{CfDomain, DomainApi, JobApi};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

impl FillUnset for DomainParameters {
    fn fill_unset(&mut self, from: &Self) {
        fill_string(&mut self.name, &from.name);
        fill_option(&mut self.internal, &from.internal);
        fill_option(&mut self.org.org, &from.org.org);
    }
}

impl ManagedKind for Domain {
    fn validate(params: &Self::Parameters) -> Result<()> {
        validate_domain(params)
    }

    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>> {
        Box::new(DomainClient {
            domains: deps.providers.domains,
            jobs: deps.providers.jobs,
            deadline: deps.job_poll_deadline,
        })
    }
}

struct DomainClient {
    domains: Arc<dyn DomainApi>,
    jobs: Arc<dyn JobApi>,
    deadline: Duration,
}

fn observation(domain: &CfDomain) -> DomainObservation {
    DomainObservation {
        guid: Some(domain.guid.clone()),
        name: Some(domain.name.clone()),
        internal: Some(domain.internal),
        org_guid: domain.org_guid.clone(),
    }
}

#[async_trait]
impl ExternalClient<Domain> for DomainClient {
    async fn resolve_references(
        &self,
        resolver: &Resolver<'_>,
        params: &mut ResolvedParams<DomainParameters>,
    ) -> Result<Resolution> {
        let resolved = resolver.resolve_org(&params.working.org).await?;
        Ok(apply_resolved(resolved, params, |p, guid| p.org.org = Some(guid)))
    }

    async fn observe(&self, resource: &mut Domain) -> Result<ExternalObservation> {
        let Some(guid) = resource.external_name().map(str::to_string) else {
            return Ok(ExternalObservation::absent());
        };
        let Some(domain) = self.domains.get_domain(&guid).await? else {
            return Ok(ExternalObservation::absent());
        };
        *resource.at_provider_mut() = observation(&domain);
        Ok(ExternalObservation::present(domain.guid, true))
    }

    async fn create(&self, resource: &mut Domain) -> Result<ExternalCreation> {
        let params = resource.for_provider();
        let domain = self
            .domains
            .create_domain(&params.name, params.internal, params.org.org.as_deref())
            .await?;
        *resource.at_provider_mut() = observation(&domain);
        Ok(ExternalCreation {
            external_name: Some(domain.guid),
        })
    }

    async fn update(&self, _resource: &mut Domain) -> Result<()> {
        debug!("Domains are immutable, nothing to update");
        Ok(())
    }

    async fn delete(&self, resource: &mut Domain) -> Result<()> {
        let guid = external_guid(resource)?;
        let result = self.domains.delete_domain(&guid).await;
        await_deletion(self.jobs.as_ref(), result, self.deadline).await
    }
}
