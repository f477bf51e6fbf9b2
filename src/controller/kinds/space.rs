//! Space external client. SSH access is a separate CF feature toggle and is
//! read and written alongside the space itself.

use super::{apply_resolved, await_deletion, external_guid, resolved_guid};
use crate::controller::drift::{fill_option, fill_string, late_init, optional_matches, FillUnset};
use crate::controller::managed::{
    ClientDeps, ExternalClient, ExternalCreation, ExternalObservation, ManagedKind, Resolution,
    ResolvedParams,
};
use crate::controller::resolver::Resolver;
use crate::controller::validation::validate_space;
use crate::crd::{Managed, Space, SpaceObservation, SpaceParameters};
use crate::error::Result;
use crate::provider::{CfSpace, JobApi, SpaceApi};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

impl FillUnset for SpaceParameters {
    fn fill_unset(&mut self, from: &Self) {
        fill_string(&mut self.name, &from.name);
        fill_option(&mut self.org.org, &from.org.org);
        fill_option(&mut self.allow_ssh, &from.allow_ssh);
    }
}

impl ManagedKind for Space {
    fn validate(params: &Self::Parameters) -> Result<()> {
        validate_space(params)
    }

    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>> {
        Box::new(SpaceClient {
            spaces: deps.providers.spaces,
            jobs: deps.providers.jobs,
            deadline: deps.job_poll_deadline,
        })
    }
}

struct SpaceClient {
    spaces: Arc<dyn SpaceApi>,
    jobs: Arc<dyn JobApi>,
    deadline: Duration,
}

fn observation(space: &CfSpace, allow_ssh: bool) -> SpaceObservation {
    SpaceObservation {
        guid: Some(space.guid.clone()),
        name: Some(space.name.clone()),
        org_guid: Some(space.org_guid.clone()),
        allow_ssh: Some(allow_ssh),
    }
}

#[async_trait]
impl ExternalClient<Space> for SpaceClient {
    async fn resolve_references(
        &self,
        resolver: &Resolver<'_>,
        params: &mut ResolvedParams<SpaceParameters>,
    ) -> Result<Resolution> {
        let resolved = resolver.resolve_org(&params.working.org).await?;
        Ok(apply_resolved(resolved, params, |p, guid| p.org.org = Some(guid)))
    }

    async fn observe(&self, resource: &mut Space) -> Result<ExternalObservation> {
        let Some(guid) = resource.external_name().map(str::to_string) else {
            return Ok(ExternalObservation::absent());
        };
        let Some(space) = self.spaces.get_space(&guid).await? else {
            return Ok(ExternalObservation::absent());
        };
        let allow_ssh = self.spaces.get_space_ssh(&space.guid).await?;
        let params = resource.for_provider();
        let up_to_date = params.name == space.name && optional_matches(&params.allow_ssh, &Some(allow_ssh));
        *resource.at_provider_mut() = observation(&space, allow_ssh);
        Ok(ExternalObservation::present(space.guid, up_to_date))
    }

    fn late_initialize(&self, params: &mut SpaceParameters, observed: &SpaceObservation) -> bool {
        late_init(&mut params.allow_ssh, observed.allow_ssh.as_ref())
    }

    async fn create(&self, resource: &mut Space) -> Result<ExternalCreation> {
        let params = resource.for_provider().clone();
        let org_guid = resolved_guid(params.org.org.as_ref(), "org")?;
        let space = self.spaces.create_space(&params.name, org_guid).await?;
        let allow_ssh = match params.allow_ssh {
            Some(enabled) => {
                self.spaces.set_space_ssh(&space.guid, enabled).await?;
                enabled
            }
            None => self.spaces.get_space_ssh(&space.guid).await?,
        };
        *resource.at_provider_mut() = observation(&space, allow_ssh);
        Ok(ExternalCreation {
            external_name: Some(space.guid),
        })
    }

    async fn update(&self, resource: &mut Space) -> Result<()> {
        let guid = external_guid(resource)?;
        let params = resource.for_provider().clone();
        let observed = resource.at_provider().cloned().unwrap_or_default();

        let space = if observed.name.as_deref() == Some(params.name.as_str()) {
            CfSpace {
                guid: guid.clone(),
                name: params.name.clone(),
                org_guid: observed.org_guid.clone().unwrap_or_default(),
            }
        } else {
            self.spaces.update_space(&guid, &params.name).await?
        };
        let mut allow_ssh = observed.allow_ssh.unwrap_or_default();
        if let Some(enabled) = params.allow_ssh.filter(|e| observed.allow_ssh != Some(*e)) {
            self.spaces.set_space_ssh(&guid, enabled).await?;
            allow_ssh = enabled;
        }
        *resource.at_provider_mut() = observation(&space, allow_ssh);
        Ok(())
    }

    async fn delete(&self, resource: &mut Space) -> Result<()> {
        let guid = external_guid(resource)?;
        let result = self.spaces.delete_space(&guid).await;
        await_deletion(self.jobs.as_ref(), result, self.deadline).await
    }
}
