//! Organization external client.

use super::{await_deletion, external_guid};
use crate::controller::drift::{fill_option, fill_string, late_init, optional_matches, FillUnset};
use crate::controller::managed::{ClientDeps, ExternalClient, ExternalCreation, ExternalObservation, ManagedKind};
use crate::controller::validation::validate_organization;
use crate::crd::{Managed, Organization, OrganizationObservation, OrganizationParameters};
use crate::error::Result;
use crate::provider::{CfOrganization, JobApi, OrganizationApi};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

impl FillUnset for OrganizationParameters {
    fn fill_unset(&mut self, from: &Self) {
        fill_string(&mut self.name, &from.name);
        fill_option(&mut self.suspended, &from.suspended);
    }
}

impl ManagedKind for Organization {
    fn validate(params: &Self::Parameters) -> Result<()> {
        validate_organization(params)
    }

    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>> {
        Box::new(OrganizationClient {
            organizations: deps.providers.organizations,
            jobs: deps.providers.jobs,
            deadline: deps.job_poll_deadline,
        })
    }
}

struct OrganizationClient {
    organizations: Arc<dyn OrganizationApi>,
    jobs: Arc<dyn JobApi>,
    deadline: Duration,
}

fn observation(org: &CfOrganization) -> OrganizationObservation {
    OrganizationObservation {
        guid: Some(org.guid.clone()),
        name: Some(org.name.clone()),
        suspended: Some(org.suspended),
        created_at: org.created_at.clone(),
    }
}

#[async_trait]
impl ExternalClient<Organization> for OrganizationClient {
    async fn observe(&self, resource: &mut Organization) -> Result<ExternalObservation> {
        let Some(guid) = resource.external_name().map(str::to_string) else {
            return Ok(ExternalObservation::absent());
        };
        let Some(org) = self.organizations.get_organization(&guid).await? else {
            return Ok(ExternalObservation::absent());
        };
        let params = resource.for_provider();
        let up_to_date =
            params.name == org.name && optional_matches(&params.suspended, &Some(org.suspended));
        *resource.at_provider_mut() = observation(&org);
        Ok(ExternalObservation::present(org.guid, up_to_date))
    }

    fn late_initialize(
        &self,
        params: &mut OrganizationParameters,
        observed: &OrganizationObservation,
    ) -> bool {
        late_init(&mut params.suspended, observed.suspended.as_ref())
    }

    async fn create(&self, resource: &mut Organization) -> Result<ExternalCreation> {
        let params = resource.for_provider();
        let org = self
            .organizations
            .create_organization(&params.name, params.suspended)
            .await?;
        *resource.at_provider_mut() = observation(&org);
        Ok(ExternalCreation {
            external_name: Some(org.guid),
        })
    }

    async fn update(&self, resource: &mut Organization) -> Result<()> {
        let guid = external_guid(resource)?;
        let params = resource.for_provider();
        let org = self
            .organizations
            .update_organization(&guid, &params.name, params.suspended)
            .await?;
        *resource.at_provider_mut() = observation(&org);
        Ok(())
    }

    async fn delete(&self, resource: &mut Organization) -> Result<()> {
        let guid = external_guid(resource)?;
        let result = self.organizations.delete_organization(&guid).await;
        await_deletion(self.jobs.as_ref(), result, self.deadline).await
    }
}
