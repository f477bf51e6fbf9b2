//! Organization quota external client.
//!
//! The quota is applied to every organization in `orgs` plus the targets of
//! `orgsRefs`. Organizations are only ever added: CF has no call to detach a
//! quota, a quota is replaced by applying another one to the organization.

use super::{await_deletion, external_guid};
use crate::controller::drift::{fill_option, fill_string, fill_vec, late_init, optional_matches, FillUnset};
use crate::controller::managed::{
    ClientDeps, ExternalClient, ExternalCreation, ExternalObservation, ManagedKind, Resolution,
    ResolvedParams,
};
use crate::controller::resolver::{RefKind, Resolved, Resolver};
use crate::controller::validation::validate_org_quota;
use crate::crd::{Managed, OrgQuota, OrgQuotaObservation, OrgQuotaParameters};
use crate::error::Result;
use crate::provider::{CfOrgQuota, JobApi, OrgQuotaApi, OrgQuotaLimits};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

impl FillUnset for OrgQuotaParameters {
    fn fill_unset(&mut self, from: &Self) {
        fill_string(&mut self.name, &from.name);
        fill_option(&mut self.total_memory_mb, &from.total_memory_mb);
        fill_option(&mut self.instance_memory_mb, &from.instance_memory_mb);
        fill_option(&mut self.total_app_instances, &from.total_app_instances);
        fill_option(&mut self.total_routes, &from.total_routes);
        fill_option(&mut self.total_service_instances, &from.total_service_instances);
        fill_option(&mut self.paid_services_allowed, &from.paid_services_allowed);
        fill_vec(&mut self.orgs, &from.orgs);
    }
}

impl ManagedKind for OrgQuota {
    fn validate(params: &Self::Parameters) -> Result<()> {
        validate_org_quota(params)
    }

    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>> {
        Box::new(OrgQuotaClient {
            quotas: deps.providers.org_quotas,
            jobs: deps.providers.jobs,
            deadline: deps.job_poll_deadline,
        })
    }
}

struct OrgQuotaClient {
    quotas: Arc<dyn OrgQuotaApi>,
    jobs: Arc<dyn JobApi>,
    deadline: Duration,
}

fn limits(params: &OrgQuotaParameters) -> OrgQuotaLimits {
    OrgQuotaLimits {
        name: params.name.clone(),
        total_memory_mb: params.total_memory_mb,
        instance_memory_mb: params.instance_memory_mb,
        total_app_instances: params.total_app_instances,
        total_routes: params.total_routes,
        total_service_instances: params.total_service_instances,
        paid_services_allowed: params.paid_services_allowed,
    }
}

fn observation(quota: &CfOrgQuota) -> OrgQuotaObservation {
    let l = &quota.limits;
    OrgQuotaObservation {
        guid: Some(quota.guid.clone()),
        name: Some(l.name.clone()),
        total_memory_mb: l.total_memory_mb,
        instance_memory_mb: l.instance_memory_mb,
        total_app_instances: l.total_app_instances,
        total_routes: l.total_routes,
        total_service_instances: l.total_service_instances,
        paid_services_allowed: l.paid_services_allowed,
        orgs: quota.orgs.clone(),
    }
}

fn missing_orgs(desired: &[String], observed: &[String]) -> Vec<String> {
    desired
        .iter()
        .filter(|org| !observed.contains(org))
        .cloned()
        .collect()
}

fn is_up_to_date(params: &OrgQuotaParameters, quota: &CfOrgQuota) -> bool {
    let l = &quota.limits;
    params.name == l.name
        && optional_matches(&params.total_memory_mb, &l.total_memory_mb)
        && optional_matches(&params.instance_memory_mb, &l.instance_memory_mb)
        && optional_matches(&params.total_app_instances, &l.total_app_instances)
        && optional_matches(&params.total_routes, &l.total_routes)
        && optional_matches(&params.total_service_instances, &l.total_service_instances)
        && optional_matches(&params.paid_services_allowed, &l.paid_services_allowed)
        && missing_orgs(&params.orgs, &quota.orgs).is_empty()
}

#[async_trait]
impl ExternalClient<OrgQuota> for OrgQuotaClient {
    async fn resolve_references(
        &self,
        resolver: &Resolver<'_>,
        params: &mut ResolvedParams<OrgQuotaParameters>,
    ) -> Result<Resolution> {
        for reference in params.working.orgs_refs.clone() {
            match resolver.resolve_named(RefKind::Organization, &reference).await? {
                Resolved::Guid { guid, persist } => params.write(persist, |p| {
                    if !p.orgs.contains(&guid) {
                        p.orgs.push(guid.clone());
                    }
                }),
                Resolved::Pending(reason) => return Ok(Resolution::Pending(reason)),
                Resolved::Unset => {}
            }
        }
        Ok(Resolution::Resolved)
    }

    async fn observe(&self, resource: &mut OrgQuota) -> Result<ExternalObservation> {
        let Some(guid) = resource.external_name().map(str::to_string) else {
            return Ok(ExternalObservation::absent());
        };
        let Some(quota) = self.quotas.get_org_quota(&guid).await? else {
            return Ok(ExternalObservation::absent());
        };
        let up_to_date = is_up_to_date(resource.for_provider(), &quota);
        *resource.at_provider_mut() = observation(&quota);
        Ok(ExternalObservation::present(quota.guid, up_to_date))
    }

    fn late_initialize(&self, params: &mut OrgQuotaParameters, observed: &OrgQuotaObservation) -> bool {
        let mut changed = late_init(&mut params.total_memory_mb, observed.total_memory_mb.as_ref());
        changed |= late_init(&mut params.instance_memory_mb, observed.instance_memory_mb.as_ref());
        changed |= late_init(&mut params.total_app_instances, observed.total_app_instances.as_ref());
        changed |= late_init(&mut params.total_routes, observed.total_routes.as_ref());
        changed |= late_init(
            &mut params.total_service_instances,
            observed.total_service_instances.as_ref(),
        );
        changed |= late_init(
            &mut params.paid_services_allowed,
            observed.paid_services_allowed.as_ref(),
        );
        changed
    }

    async fn create(&self, resource: &mut OrgQuota) -> Result<ExternalCreation> {
        let params = resource.for_provider();
        let quota = self
            .quotas
            .create_org_quota(&limits(params), &params.orgs)
            .await?;
        *resource.at_provider_mut() = observation(&quota);
        Ok(ExternalCreation {
            external_name: Some(quota.guid),
        })
    }

    async fn update(&self, resource: &mut OrgQuota) -> Result<()> {
        let guid = external_guid(resource)?;
        let params = resource.for_provider().clone();
        let mut quota = self.quotas.update_org_quota(&guid, &limits(&params)).await?;
        let missing = missing_orgs(&params.orgs, &quota.orgs);
        if !missing.is_empty() {
            info!("Applying quota {} to {} organization(s)", guid, missing.len());
            self.quotas.apply_org_quota(&guid, &missing).await?;
            quota.orgs.extend(missing);
        }
        *resource.at_provider_mut() = observation(&quota);
        Ok(())
    }

    async fn delete(&self, resource: &mut OrgQuota) -> Result<()> {
        let guid = external_guid(resource)?;
        let result = self.quotas.delete_org_quota(&guid).await;
        await_deletion(self.jobs.as_ref(), result, self.deadline).await
    }
}
