//! # Provider
//!
//! Cloud Foundry operations consumed by the managed resource handlers.
//!
//! Each concern is a separate trait so a handler holds only what it needs
//! and tests can substitute in-memory fakes. [`cloudfoundry::CfClient`]
//! implements all of them over the CF v3 and deploy-service REST APIs.

pub mod cache;
pub mod cloudfoundry;

use crate::crd::Operation;
use crate::error::{Attributes, Error};
use async_trait::async_trait;
use std::sync::Arc;

/// Provider call failure, classified at the HTTP edge
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    /// 429, 5xx or transport failure
    #[error("{message}")]
    Transient { message: String, status: Option<u16> },
    /// Any other 4xx or an undecodable body
    #[error("{message}")]
    Permanent { message: String, status: Option<u16> },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Metric label of the failure class
    pub fn class(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err {
            ApiError::NotFound(_) => Error::ProviderPermanent {
                message,
                attributes: Attributes::new().with("status", 404),
            },
            ApiError::Transient { status, .. } => Error::ProviderTransient {
                message,
                attributes: status
                    .map(|s| Attributes::new().with("status", s))
                    .unwrap_or_default(),
            },
            ApiError::Permanent { status, .. } => Error::ProviderPermanent {
                message,
                attributes: status
                    .map(|s| Attributes::new().with("status", s))
                    .unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfOrganization {
    pub guid: String,
    pub name: String,
    pub suspended: bool,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfSpace {
    pub guid: String,
    pub name: String,
    pub org_guid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfDomain {
    pub guid: String,
    pub name: String,
    pub internal: bool,
    /// Owning organization of a private domain
    pub org_guid: Option<String>,
}

/// Writable organization quota limits; `None` means unlimited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgQuotaLimits {
    pub name: String,
    pub total_memory_mb: Option<i64>,
    pub instance_memory_mb: Option<i64>,
    pub total_app_instances: Option<i64>,
    pub total_routes: Option<i64>,
    pub total_service_instances: Option<i64>,
    pub paid_services_allowed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfOrgQuota {
    pub guid: String,
    pub limits: OrgQuotaLimits,
    pub orgs: Vec<String>,
}

/// A role held by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfRole {
    pub guid: String,
    pub username: String,
    pub origin: Option<String>,
}

/// Accepted asynchronous archive upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub job_id: String,
    /// Instance the job is pinned to; must be replayed when polling
    pub app_instance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub operation: Operation,
    /// Set once the upload finished
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtaOperationStatus {
    pub operation: Operation,
    pub mta_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedMta {
    pub id: String,
    pub version: Option<String>,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    Deploy,
    BlueGreenDeploy,
    Undeploy,
}

impl ProcessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deploy => "DEPLOY",
            Self::BlueGreenDeploy => "BLUE_GREEN_DEPLOY",
            Self::Undeploy => "UNDEPLOY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub process_type: ProcessType,
    pub file_ids: Vec<String>,
    pub extension_id: Option<String>,
    pub modules: Option<Vec<String>>,
    pub namespace: Option<String>,
    pub version_rule: String,
    pub abort_on_error: bool,
    pub delete_services: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeployRequest {
    pub mta_id: String,
    pub namespace: Option<String>,
    pub delete_services: bool,
}

#[async_trait]
pub trait OrganizationApi: Send + Sync {
    async fn get_organization(&self, guid: &str) -> ApiResult<Option<CfOrganization>>;
    async fn create_organization(
        &self,
        name: &str,
        suspended: Option<bool>,
    ) -> ApiResult<CfOrganization>;
    async fn update_organization(
        &self,
        guid: &str,
        name: &str,
        suspended: Option<bool>,
    ) -> ApiResult<CfOrganization>;
    /// Returns the deletion job id
    async fn delete_organization(&self, guid: &str) -> ApiResult<Option<String>>;
}

#[async_trait]
pub trait SpaceApi: Send + Sync {
    async fn get_space(&self, guid: &str) -> ApiResult<Option<CfSpace>>;
    async fn create_space(&self, name: &str, org_guid: &str) -> ApiResult<CfSpace>;
    async fn update_space(&self, guid: &str, name: &str) -> ApiResult<CfSpace>;
    async fn delete_space(&self, guid: &str) -> ApiResult<Option<String>>;
    async fn get_space_ssh(&self, guid: &str) -> ApiResult<bool>;
    async fn set_space_ssh(&self, guid: &str, enabled: bool) -> ApiResult<()>;
}

#[async_trait]
pub trait DomainApi: Send + Sync {
    async fn get_domain(&self, guid: &str) -> ApiResult<Option<CfDomain>>;
    async fn create_domain(
        &self,
        name: &str,
        internal: Option<bool>,
        org_guid: Option<&str>,
    ) -> ApiResult<CfDomain>;
    async fn delete_domain(&self, guid: &str) -> ApiResult<Option<String>>;
}

#[async_trait]
pub trait OrgQuotaApi: Send + Sync {
    async fn get_org_quota(&self, guid: &str) -> ApiResult<Option<CfOrgQuota>>;
    async fn create_org_quota(&self, limits: &OrgQuotaLimits, orgs: &[String])
        -> ApiResult<CfOrgQuota>;
    async fn update_org_quota(&self, guid: &str, limits: &OrgQuotaLimits) -> ApiResult<CfOrgQuota>;
    /// Apply the quota to additional organizations
    async fn apply_org_quota(&self, guid: &str, orgs: &[String]) -> ApiResult<()>;
    async fn delete_org_quota(&self, guid: &str) -> ApiResult<Option<String>>;
}

#[async_trait]
pub trait RoleApi: Send + Sync {
    async fn list_space_roles(&self, space_guid: &str, role_type: &str) -> ApiResult<Vec<CfRole>>;
    async fn create_space_role(
        &self,
        space_guid: &str,
        role_type: &str,
        username: &str,
        origin: &str,
    ) -> ApiResult<CfRole>;
    async fn delete_role(&self, guid: &str) -> ApiResult<Option<String>>;
}

/// CF v3 asynchronous jobs, normalized to [`Operation`] states
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn get_job(&self, job_id: &str) -> ApiResult<Operation>;
}

/// Deploy-service operations
#[async_trait]
pub trait MtaApi: Send + Sync {
    /// Start an asynchronous upload of the archive at `url`
    async fn upload_file(&self, space_guid: &str, url: &str) -> ApiResult<FileUpload>;
    async fn get_file_job(
        &self,
        space_guid: &str,
        job_id: &str,
        app_instance: Option<&str>,
    ) -> ApiResult<FileJob>;
    /// Upload an extension descriptor, returning its file id
    async fn upload_extension(&self, space_guid: &str, descriptor: &str) -> ApiResult<String>;
    /// Submit a deploy, returning the operation id
    async fn deploy(&self, space_guid: &str, request: &DeployRequest) -> ApiResult<String>;
    async fn undeploy(&self, space_guid: &str, request: &UndeployRequest) -> ApiResult<String>;
    async fn get_operation(
        &self,
        space_guid: &str,
        operation_id: &str,
    ) -> ApiResult<MtaOperationStatus>;
    async fn get_mta(&self, space_guid: &str, mta_id: &str) -> ApiResult<Option<DeployedMta>>;
}

/// Resolution of plain CF names to GUIDs
#[async_trait]
pub trait NameLookup: Send + Sync {
    async fn org_guid_by_name(&self, name: &str) -> ApiResult<Option<String>>;
    async fn space_guid_by_name(&self, org_name: &str, space_name: &str)
        -> ApiResult<Option<String>>;
}

/// Every provider seam for one provider config
#[derive(Clone)]
pub struct Providers {
    pub organizations: Arc<dyn OrganizationApi>,
    pub spaces: Arc<dyn SpaceApi>,
    pub domains: Arc<dyn DomainApi>,
    pub org_quotas: Arc<dyn OrgQuotaApi>,
    pub roles: Arc<dyn RoleApi>,
    pub jobs: Arc<dyn JobApi>,
    pub mta: Arc<dyn MtaApi>,
    pub names: Arc<dyn NameLookup>,
}

impl Providers {
    /// Use one implementation for every seam
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: OrganizationApi
            + SpaceApi
            + DomainApi
            + OrgQuotaApi
            + RoleApi
            + JobApi
            + MtaApi
            + NameLookup
            + 'static,
    {
        Self {
            organizations: client.clone(),
            spaces: client.clone(),
            domains: client.clone(),
            org_quotas: client.clone(),
            roles: client.clone(),
            jobs: client.clone(),
            mta: client.clone(),
            names: client,
        }
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}

/// Produces the provider seams for a `ProviderConfig`
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, provider_config: &str) -> crate::error::Result<Providers>;
}
