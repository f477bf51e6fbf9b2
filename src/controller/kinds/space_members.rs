//! Space role assignments.
//!
//! One resource manages one role type in one space. The external name is
//! `<space-guid>/<role-type>` and is recorded on the first successful apply.

use super::{apply_resolved, resolved_guid};
use crate::constants::DEFAULT_ORIGIN;
use crate::controller::drift::{fill_option, FillUnset};
use crate::controller::managed::{
    ClientDeps, ExternalClient, ExternalCreation, ExternalObservation, ManagedKind, Resolution,
    ResolvedParams,
};
use crate::controller::members::{self, is_same_member, member_key, MemberPlan};
use crate::controller::operation::poll_job_complete;
use crate::controller::resolver::Resolver;
use crate::controller::validation::validate_space_members;
use crate::crd::{Managed, SpaceMembers, SpaceMembersObservation, SpaceMembersParameters};
use crate::error::{Error, Result};
use crate::provider::{ApiError, CfRole, JobApi, RoleApi};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

impl FillUnset for SpaceMembersParameters {
    fn fill_unset(&mut self, from: &Self) {
        fill_option(&mut self.space.space, &from.space.space);
        if self.members.is_empty() {
            self.members.clone_from(&from.members);
        }
    }
}

impl ManagedKind for SpaceMembers {
    fn validate(params: &Self::Parameters) -> Result<()> {
        validate_space_members(params)
    }

    fn external_client(deps: ClientDeps) -> Box<dyn ExternalClient<Self>> {
        Box::new(SpaceMembersClient {
            roles: deps.providers.roles,
            jobs: deps.providers.jobs,
            deadline: deps.job_poll_deadline,
        })
    }
}

struct SpaceMembersClient {
    roles: Arc<dyn RoleApi>,
    jobs: Arc<dyn JobApi>,
    deadline: Duration,
}

fn external_name(space_guid: &str, params: &SpaceMembersParameters) -> String {
    format!("{}/{}", space_guid, params.role_type.as_cf_type())
}

/// Member key to role GUID for every desired member holding the role
fn assigned_roles(params: &SpaceMembersParameters, roles: &[CfRole]) -> BTreeMap<String, String> {
    params
        .members
        .iter()
        .filter_map(|member| {
            roles
                .iter()
                .find(|role| is_same_member(member, role))
                .map(|role| (member_key(&member.username, member.origin.as_deref()), role.guid.clone()))
        })
        .collect()
}

impl SpaceMembersClient {
    async fn apply(&self, resource: &mut SpaceMembers) -> Result<String> {
        let params = resource.for_provider().clone();
        let space_guid = resolved_guid(params.space.space.as_ref(), "space")?.to_string();
        let role_type = params.role_type.as_cf_type();

        let mut roles = self.roles.list_space_roles(&space_guid, role_type).await?;
        let MemberPlan { grant, revoke } = members::plan(&params.members, &roles, params.enforcement_policy);

        for member in &grant {
            let origin = member.origin.as_deref().unwrap_or(DEFAULT_ORIGIN);
            info!("Granting {} to {} ({})", role_type, member.username, origin);
            let role = self
                .roles
                .create_space_role(&space_guid, role_type, &member.username, origin)
                .await
                .map_err(|e| Error::from(e).with("member", &member.username))?;
            roles.push(role);
        }
        for role in &revoke {
            info!("Revoking {} from {}", role_type, role.username);
            self.delete_role(role).await?;
        }
        roles.retain(|role| !revoke.iter().any(|r| r.guid == role.guid));

        resource.at_provider_mut().assigned_roles = assigned_roles(&params, &roles);
        Ok(external_name(&space_guid, &params))
    }

    async fn delete_role(&self, role: &CfRole) -> Result<()> {
        match self.roles.delete_role(&role.guid).await {
            Ok(Some(job_id)) => poll_job_complete(self.jobs.as_ref(), &job_id, self.deadline).await,
            Ok(None) | Err(ApiError::NotFound(_)) => Ok(()),
            Err(e) => Err(Error::from(e).with("role", &role.guid)),
        }
    }
}

#[async_trait]
impl ExternalClient<SpaceMembers> for SpaceMembersClient {
    async fn resolve_references(
        &self,
        resolver: &Resolver<'_>,
        params: &mut ResolvedParams<SpaceMembersParameters>,
    ) -> Result<Resolution> {
        let resolved = resolver.resolve_space(&params.working.space).await?;
        Ok(apply_resolved(resolved, params, |p, guid| p.space.space = Some(guid)))
    }

    async fn observe(&self, resource: &mut SpaceMembers) -> Result<ExternalObservation> {
        let params = resource.for_provider().clone();
        let space_guid = resolved_guid(params.space.space.as_ref(), "space")?;
        let name = external_name(space_guid, &params);
        if resource.external_name() != Some(name.as_str()) {
            return Ok(ExternalObservation::absent());
        }

        let roles = match self
            .roles
            .list_space_roles(space_guid, params.role_type.as_cf_type())
            .await
        {
            Ok(roles) => roles,
            Err(ApiError::NotFound(_)) => return Ok(ExternalObservation::absent()),
            Err(e) => return Err(e.into()),
        };
        let plan = members::plan(&params.members, &roles, params.enforcement_policy);
        resource.at_provider_mut().assigned_roles = assigned_roles(&params, &roles);
        Ok(ExternalObservation::present(name, plan.is_empty()))
    }

    async fn create(&self, resource: &mut SpaceMembers) -> Result<ExternalCreation> {
        let name = self.apply(resource).await?;
        Ok(ExternalCreation {
            external_name: Some(name),
        })
    }

    async fn update(&self, resource: &mut SpaceMembers) -> Result<()> {
        self.apply(resource).await.map(|_| ())
    }

    /// Revoke the role from the listed members only
    async fn delete(&self, resource: &mut SpaceMembers) -> Result<()> {
        let params = resource.for_provider().clone();
        let space_guid = resolved_guid(params.space.space.as_ref(), "space")?;
        let roles = match self
            .roles
            .list_space_roles(space_guid, params.role_type.as_cf_type())
            .await
        {
            Ok(roles) => roles,
            Err(ApiError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for role in roles
            .iter()
            .filter(|role| params.members.iter().any(|m| is_same_member(m, role)))
        {
            info!("Revoking {} from {}", params.role_type.as_cf_type(), role.username);
            self.delete_role(role).await?;
        }
        resource.at_provider_mut().assigned_roles.clear();
        Ok(())
    }
}
