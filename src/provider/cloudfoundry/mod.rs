//! # Cloud Foundry Client
//!
//! REST client for the CF v3 API and the MTA deploy-service v2 API.
//!
//! - Bearer tokens come from [`auth::TokenProvider`]; a request rejected
//!   with 401 is retried once with a fresh token
//! - Failures are classified at the edge: 404 is [`ApiError::NotFound`],
//!   429/5xx/transport are transient, everything else is permanent
//! - Every call is counted and timed per operation name

pub mod auth;
pub mod types;

use crate::constants::PROVIDER_REQUEST_TIMEOUT_SECS;
use crate::controller::operation::{STATE_FAILED, STATE_FINISHED, STATE_RUNNING};
use crate::crd::Operation;
use crate::observability::metrics::{
    increment_provider_request_errors, increment_provider_requests,
    observe_provider_request_duration,
};
use crate::provider::{
    ApiError, ApiResult, CfDomain, CfOrgQuota, CfOrganization, CfRole, CfSpace, DeployRequest,
    DeployedMta, DomainApi, FileJob, FileUpload, JobApi, MtaApi, MtaOperationStatus, NameLookup,
    OrgQuotaApi, OrgQuotaLimits, OrganizationApi, ProcessType, RoleApi, SpaceApi,
    UndeployRequest,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::LOCATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use self::auth::{Credentials, TokenProvider};
use self::types::{
    CfErrors, DeployServiceError, Domain, FileJobResponse, FileMetadata, ListResponse, Mta,
    OperationRequest, OperationResponse, OrgQuota, OrgQuotaBody, Organization, QuotaApps,
    QuotaRoutes, QuotaServices, RoleList, Space, SshFeature,
};

/// Connection settings of one provider config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api: String,
    pub deploy_service: String,
    pub skip_ssl_validation: bool,
}

/// CF v3 and deploy-service client for one provider config
pub struct CfClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    auth: TokenProvider,
}

impl std::fmt::Debug for CfClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CfClient")
            .field("api", &self.endpoints.api)
            .field("deploy_service", &self.endpoints.deploy_service)
            .finish_non_exhaustive()
    }
}

impl CfClient {
    /// Build a client; no request is sent until the first call
    pub fn new(endpoints: Endpoints, credentials: Credentials) -> ApiResult<Self> {
        let endpoints = Endpoints {
            api: endpoints.api.trim_end_matches('/').to_string(),
            deploy_service: endpoints.deploy_service.trim_end_matches('/').to_string(),
            skip_ssl_validation: endpoints.skip_ssl_validation,
        };
        if endpoints.skip_ssl_validation {
            warn!("TLS certificate validation disabled for {}", endpoints.api);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(endpoints.skip_ssl_validation)
            .build()
            .map_err(|e| ApiError::Permanent {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;
        let auth = TokenProvider::new(http.clone(), &endpoints.api, credentials);
        Ok(Self {
            http,
            endpoints,
            auth,
        })
    }

    fn cf(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api, path)
    }

    fn ds(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.deploy_service, path)
    }

    /// Send an authorized request, recording per-operation metrics
    async fn send<F>(&self, op: &'static str, build: F) -> ApiResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let started = Instant::now();
        increment_provider_requests(op);
        let result = self.send_authorized(&build).await;
        observe_provider_request_duration(op, started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            increment_provider_request_errors(op, e.class());
        }
        result
    }

    async fn send_authorized<F>(&self, build: &F) -> ApiResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let token = self.auth.token().await?;
        let response = build()
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        debug!("CF rejected the bearer token, refreshing once");
        self.auth.invalidate(&token).await;
        let token = self.auth.token().await?;
        let response = build()
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }

    async fn send_json<T, F>(&self, op: &'static str, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        self.send(op, build)
            .await?
            .json()
            .await
            .map_err(|e| decode_error(op, &e))
    }

    /// Every page of a CF v3 list
    async fn list_all<T>(
        &self,
        op: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut page: ListResponse<T> = self.send_json(op, || self.http.get(url).query(query)).await?;
        let mut items = Vec::new();
        loop {
            let next = page.next_page().map(str::to_string);
            items.extend(page.resources);
            let Some(next) = next else {
                return Ok(items);
            };
            page = self.send_json(op, || self.http.get(&next)).await?;
        }
    }

    /// Issue a CF v3 delete and return the job tracking it
    async fn delete_with_job(&self, op: &'static str, url: &str) -> ApiResult<Option<String>> {
        let response = self.send(op, || self.http.delete(url)).await?;
        Ok(location(&response)
            .and_then(|l| paths::cf::job_guid_from_location(l).map(str::to_string)))
    }

    async fn submit_operation(
        &self,
        space_guid: &str,
        request: &OperationRequest,
    ) -> ApiResult<String> {
        let url = self.ds(&paths::deploy_service::operations(space_guid));
        let response = self
            .send("mta.operations.start", || self.http.post(&url).json(request))
            .await?;
        location(&response)
            .and_then(paths::deploy_service::id_from_location)
            .map(str::to_string)
            .ok_or_else(|| missing_location("operation"))
    }
}

/// Convert an absent resource into `None`
fn found<T>(result: ApiResult<T>) -> ApiResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn location(response: &Response) -> Option<&str> {
    response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

fn missing_location(what: &str) -> ApiError {
    ApiError::Permanent {
        message: format!("{what} accepted without a Location header"),
        status: None,
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::Transient {
        message: err.to_string(),
        status: err.status().map(|s| s.as_u16()),
    }
}

pub(crate) fn decode_error(what: &str, err: &reqwest::Error) -> ApiError {
    ApiError::Permanent {
        message: format!("cannot decode {what}: {err}"),
        status: None,
    }
}

/// Pass successful responses through, classify everything else
pub(crate) async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &path, &body))
}

fn classify(status: StatusCode, path: &str, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(path.to_string());
    }
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status} from {path}"));
    let code = Some(status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ApiError::Transient {
            message,
            status: code,
        }
    } else {
        ApiError::Permanent {
            message,
            status: code,
        }
    }
}

/// Human-readable message from a CF v3 or deploy-service error body
fn error_message(body: &str) -> Option<String> {
    if let Ok(cf) = serde_json::from_str::<CfErrors>(body) {
        let details: Vec<&str> = cf.errors.iter().filter_map(|e| e.message()).collect();
        if !details.is_empty() {
            return Some(details.join("; "));
        }
    }
    serde_json::from_str::<DeployServiceError>(body)
        .ok()
        .map(|e| e.message)
}

/// Normalize a CF v3 job state
fn job_state(state: &str) -> &str {
    match state {
        "COMPLETE" => STATE_FINISHED,
        "PROCESSING" | "POLLING" => STATE_RUNNING,
        other => other,
    }
}

/// Normalize a deploy-service operation or file job status
fn deploy_service_state(state: &str) -> &str {
    match state {
        "ERROR" => STATE_FAILED,
        other => other,
    }
}

fn organization(org: Organization) -> CfOrganization {
    CfOrganization {
        guid: org.guid,
        name: org.name,
        suspended: org.suspended,
        created_at: org.created_at,
    }
}

fn space(space: Space) -> CfSpace {
    CfSpace {
        guid: space.guid,
        name: space.name,
        org_guid: space
            .relationships
            .organization
            .data
            .map(|d| d.guid)
            .unwrap_or_default(),
    }
}

fn domain(domain: Domain) -> CfDomain {
    CfDomain {
        guid: domain.guid,
        name: domain.name,
        internal: domain.internal,
        org_guid: domain.relationships.organization.data.map(|d| d.guid),
    }
}

fn org_quota(quota: OrgQuota) -> CfOrgQuota {
    CfOrgQuota {
        guid: quota.guid,
        limits: OrgQuotaLimits {
            name: quota.name,
            total_memory_mb: quota.apps.total_memory_in_mb,
            instance_memory_mb: quota.apps.per_process_memory_in_mb,
            total_app_instances: quota.apps.total_instances,
            total_routes: quota.routes.total_routes,
            total_service_instances: quota.services.total_service_instances,
            paid_services_allowed: quota.services.paid_services_allowed,
        },
        orgs: quota
            .relationships
            .organizations
            .data
            .into_iter()
            .map(|d| d.guid)
            .collect(),
    }
}

fn org_quota_body<'a>(limits: &'a OrgQuotaLimits, orgs: &[String]) -> OrgQuotaBody<'a> {
    OrgQuotaBody {
        name: &limits.name,
        apps: QuotaApps {
            total_memory_in_mb: limits.total_memory_mb,
            per_process_memory_in_mb: limits.instance_memory_mb,
            total_instances: limits.total_app_instances,
        },
        services: QuotaServices {
            paid_services_allowed: limits.paid_services_allowed,
            total_service_instances: limits.total_service_instances,
        },
        routes: QuotaRoutes {
            total_routes: limits.total_routes,
        },
        relationships: (!orgs.is_empty())
            .then(|| json!({ "organizations": { "data": guid_refs(orgs) } })),
    }
}

fn guid_refs(guids: &[String]) -> Vec<Value> {
    guids.iter().map(|g| json!({ "guid": g })).collect()
}

fn deploy_parameters(request: &DeployRequest) -> Map<String, Value> {
    let mut parameters = Map::new();
    parameters.insert("appArchiveId".into(), json!(request.file_ids.join(",")));
    if let Some(extension) = &request.extension_id {
        parameters.insert("mtaExtDescriptorId".into(), json!(extension));
    }
    if let Some(modules) = &request.modules {
        parameters.insert("modulesForDeployment".into(), json!(modules));
    }
    if let Some(namespace) = &request.namespace {
        parameters.insert("namespace".into(), json!(namespace));
    }
    parameters.insert("versionRule".into(), json!(request.version_rule));
    parameters.insert("abortOnError".into(), json!(request.abort_on_error));
    parameters.insert("deleteServices".into(), json!(request.delete_services));
    if request.process_type == ProcessType::BlueGreenDeploy {
        parameters.insert("noConfirm".into(), json!(true));
    }
    parameters
}

#[async_trait]
impl OrganizationApi for CfClient {
    async fn get_organization(&self, guid: &str) -> ApiResult<Option<CfOrganization>> {
        let url = self.cf(&paths::cf::organization(guid));
        found(self.send_json::<Organization, _>("organizations.get", || self.http.get(&url)).await)
            .map(|o| o.map(organization))
    }

    async fn create_organization(
        &self,
        name: &str,
        suspended: Option<bool>,
    ) -> ApiResult<CfOrganization> {
        let url = self.cf(&paths::cf::organizations());
        let mut body = json!({ "name": name });
        if let Some(suspended) = suspended {
            body["suspended"] = json!(suspended);
        }
        self.send_json::<Organization, _>("organizations.create", || {
            self.http.post(&url).json(&body)
        })
        .await
        .map(organization)
    }

    async fn update_organization(
        &self,
        guid: &str,
        name: &str,
        suspended: Option<bool>,
    ) -> ApiResult<CfOrganization> {
        let url = self.cf(&paths::cf::organization(guid));
        let mut body = json!({ "name": name });
        if let Some(suspended) = suspended {
            body["suspended"] = json!(suspended);
        }
        self.send_json::<Organization, _>("organizations.update", || {
            self.http.patch(&url).json(&body)
        })
        .await
        .map(organization)
    }

    async fn delete_organization(&self, guid: &str) -> ApiResult<Option<String>> {
        self.delete_with_job("organizations.delete", &self.cf(&paths::cf::organization(guid)))
            .await
    }
}

#[async_trait]
impl SpaceApi for CfClient {
    async fn get_space(&self, guid: &str) -> ApiResult<Option<CfSpace>> {
        let url = self.cf(&paths::cf::space(guid));
        found(self.send_json::<Space, _>("spaces.get", || self.http.get(&url)).await)
            .map(|s| s.map(space))
    }

    async fn create_space(&self, name: &str, org_guid: &str) -> ApiResult<CfSpace> {
        let url = self.cf(&paths::cf::spaces());
        let body = json!({
            "name": name,
            "relationships": { "organization": { "data": { "guid": org_guid } } },
        });
        self.send_json::<Space, _>("spaces.create", || self.http.post(&url).json(&body))
            .await
            .map(space)
    }

    async fn update_space(&self, guid: &str, name: &str) -> ApiResult<CfSpace> {
        let url = self.cf(&paths::cf::space(guid));
        let body = json!({ "name": name });
        self.send_json::<Space, _>("spaces.update", || self.http.patch(&url).json(&body))
            .await
            .map(space)
    }

    async fn delete_space(&self, guid: &str) -> ApiResult<Option<String>> {
        self.delete_with_job("spaces.delete", &self.cf(&paths::cf::space(guid)))
            .await
    }

    async fn get_space_ssh(&self, guid: &str) -> ApiResult<bool> {
        let url = self.cf(&paths::cf::space_ssh_feature(guid));
        self.send_json::<SshFeature, _>("spaces.ssh.get", || self.http.get(&url))
            .await
            .map(|f| f.enabled)
    }

    async fn set_space_ssh(&self, guid: &str, enabled: bool) -> ApiResult<()> {
        let url = self.cf(&paths::cf::space_ssh_feature(guid));
        let body = json!({ "enabled": enabled });
        self.send("spaces.ssh.update", || self.http.patch(&url).json(&body))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl DomainApi for CfClient {
    async fn get_domain(&self, guid: &str) -> ApiResult<Option<CfDomain>> {
        let url = self.cf(&paths::cf::domain(guid));
        found(self.send_json::<Domain, _>("domains.get", || self.http.get(&url)).await)
            .map(|d| d.map(domain))
    }

    async fn create_domain(
        &self,
        name: &str,
        internal: Option<bool>,
        org_guid: Option<&str>,
    ) -> ApiResult<CfDomain> {
        let url = self.cf(&paths::cf::domains());
        let mut body = json!({ "name": name });
        if let Some(internal) = internal {
            body["internal"] = json!(internal);
        }
        if let Some(org) = org_guid {
            body["relationships"] = json!({ "organization": { "data": { "guid": org } } });
        }
        self.send_json::<Domain, _>("domains.create", || self.http.post(&url).json(&body))
            .await
            .map(domain)
    }

    async fn delete_domain(&self, guid: &str) -> ApiResult<Option<String>> {
        self.delete_with_job("domains.delete", &self.cf(&paths::cf::domain(guid)))
            .await
    }
}

#[async_trait]
impl OrgQuotaApi for CfClient {
    async fn get_org_quota(&self, guid: &str) -> ApiResult<Option<CfOrgQuota>> {
        let url = self.cf(&paths::cf::organization_quota(guid));
        found(self.send_json::<OrgQuota, _>("org_quotas.get", || self.http.get(&url)).await)
            .map(|q| q.map(org_quota))
    }

    async fn create_org_quota(
        &self,
        limits: &OrgQuotaLimits,
        orgs: &[String],
    ) -> ApiResult<CfOrgQuota> {
        let url = self.cf(&paths::cf::organization_quotas());
        let body = org_quota_body(limits, orgs);
        self.send_json::<OrgQuota, _>("org_quotas.create", || self.http.post(&url).json(&body))
            .await
            .map(org_quota)
    }

    async fn update_org_quota(
        &self,
        guid: &str,
        limits: &OrgQuotaLimits,
    ) -> ApiResult<CfOrgQuota> {
        let url = self.cf(&paths::cf::organization_quota(guid));
        let body = org_quota_body(limits, &[]);
        self.send_json::<OrgQuota, _>("org_quotas.update", || self.http.patch(&url).json(&body))
            .await
            .map(org_quota)
    }

    async fn apply_org_quota(&self, guid: &str, orgs: &[String]) -> ApiResult<()> {
        let url = self.cf(&paths::cf::organization_quota_organizations(guid));
        let body = json!({ "data": guid_refs(orgs) });
        self.send("org_quotas.apply", || self.http.post(&url).json(&body))
            .await
            .map(|_| ())
    }

    async fn delete_org_quota(&self, guid: &str) -> ApiResult<Option<String>> {
        self.delete_with_job(
            "org_quotas.delete",
            &self.cf(&paths::cf::organization_quota(guid)),
        )
        .await
    }
}

#[async_trait]
impl RoleApi for CfClient {
    async fn list_space_roles(&self, space_guid: &str, role_type: &str) -> ApiResult<Vec<CfRole>> {
        let url = self.cf(&paths::cf::roles());
        let query = [
            ("types", role_type),
            ("space_guids", space_guid),
            ("include", "user"),
        ];
        let mut page: RoleList = self
            .send_json("roles.list", || self.http.get(&url).query(&query))
            .await?;
        let mut roles = Vec::new();
        loop {
            for role in &page.resources {
                let user_guid = role.relationships.user.data.as_ref().map(|d| d.guid.as_str());
                let user = page
                    .included
                    .users
                    .iter()
                    .find(|u| Some(u.guid.as_str()) == user_guid);
                let Some(username) = user.and_then(|u| u.username.clone()) else {
                    debug!("Role {} has no resolvable username, skipping", role.guid);
                    continue;
                };
                roles.push(CfRole {
                    guid: role.guid.clone(),
                    username,
                    origin: user.and_then(|u| u.origin.clone()),
                });
            }
            let Some(next) = page
                .pagination
                .as_ref()
                .and_then(|p| p.next.as_ref())
                .map(|l| l.href.clone())
            else {
                return Ok(roles);
            };
            page = self.send_json("roles.list", || self.http.get(&next)).await?;
        }
    }

    async fn create_space_role(
        &self,
        space_guid: &str,
        role_type: &str,
        username: &str,
        origin: &str,
    ) -> ApiResult<CfRole> {
        #[derive(serde::Deserialize)]
        struct Created {
            guid: String,
        }

        let url = self.cf(&paths::cf::roles());
        let body = json!({
            "type": role_type,
            "relationships": {
                "user": { "data": { "username": username, "origin": origin } },
                "space": { "data": { "guid": space_guid } },
            },
        });
        let created: Created = self
            .send_json("roles.create", || self.http.post(&url).json(&body))
            .await?;
        Ok(CfRole {
            guid: created.guid,
            username: username.to_string(),
            origin: Some(origin.to_string()),
        })
    }

    async fn delete_role(&self, guid: &str) -> ApiResult<Option<String>> {
        self.delete_with_job("roles.delete", &self.cf(&paths::cf::role(guid)))
            .await
    }
}

#[async_trait]
impl JobApi for CfClient {
    async fn get_job(&self, job_id: &str) -> ApiResult<Operation> {
        let url = self.cf(&paths::cf::job(job_id));
        let job: types::Job = self.send_json("jobs.get", || self.http.get(&url)).await?;
        let details: Vec<&str> = job.errors.iter().filter_map(|e| e.message()).collect();
        Ok(Operation {
            id: Some(job_id.to_string()),
            state: Some(job_state(&job.state).to_string()),
            error: (!details.is_empty()).then(|| details.join("; ")),
        })
    }
}

#[async_trait]
impl MtaApi for CfClient {
    async fn upload_file(&self, space_guid: &str, url: &str) -> ApiResult<FileUpload> {
        let endpoint = self.ds(&paths::deploy_service::files_async(space_guid));
        let body = json!({
            "file_url": base64::engine::general_purpose::STANDARD.encode(url),
        });
        let response = self
            .send("mta.files.upload_async", || self.http.post(&endpoint).json(&body))
            .await?;
        let job_id = location(&response)
            .and_then(paths::deploy_service::id_from_location)
            .map(str::to_string)
            .ok_or_else(|| missing_location("file upload"))?;
        let app_instance = response
            .headers()
            .get(paths::deploy_service::APP_INSTANCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(FileUpload {
            job_id,
            app_instance,
        })
    }

    async fn get_file_job(
        &self,
        space_guid: &str,
        job_id: &str,
        app_instance: Option<&str>,
    ) -> ApiResult<FileJob> {
        let url = self.ds(&paths::deploy_service::file_job(space_guid, job_id));
        let job: FileJobResponse = self
            .send_json("mta.files.job", || {
                let request = self.http.get(&url);
                match app_instance {
                    Some(instance) => {
                        request.header(paths::deploy_service::APP_INSTANCE_HEADER, instance)
                    }
                    None => request,
                }
            })
            .await?;
        Ok(FileJob {
            operation: Operation {
                id: Some(job_id.to_string()),
                state: Some(deploy_service_state(&job.status).to_string()),
                error: job.error,
            },
            file_id: job.file.map(|f| f.id),
        })
    }

    async fn upload_extension(&self, space_guid: &str, descriptor: &str) -> ApiResult<String> {
        let url = self.ds(&paths::deploy_service::files(space_guid));
        let uploaded: Vec<FileMetadata> = self
            .send_json("mta.files.upload", || {
                let part = reqwest::multipart::Part::text(descriptor.to_string())
                    .file_name("extension.mtaext");
                let form = reqwest::multipart::Form::new().part("file", part);
                self.http.post(&url).multipart(form)
            })
            .await?;
        uploaded
            .into_iter()
            .next()
            .map(|f| {
                debug!("Uploaded extension descriptor {:?} as {}", f.name, f.id);
                f.id
            })
            .ok_or_else(|| ApiError::Permanent {
                message: "extension upload returned no file".to_string(),
                status: None,
            })
    }

    async fn deploy(&self, space_guid: &str, request: &DeployRequest) -> ApiResult<String> {
        let body = OperationRequest {
            process_type: request.process_type.as_str(),
            parameters: deploy_parameters(request),
        };
        self.submit_operation(space_guid, &body).await
    }

    async fn undeploy(&self, space_guid: &str, request: &UndeployRequest) -> ApiResult<String> {
        let mut parameters = Map::new();
        parameters.insert("mtaId".into(), json!(request.mta_id));
        if let Some(namespace) = &request.namespace {
            parameters.insert("namespace".into(), json!(namespace));
        }
        parameters.insert("deleteServices".into(), json!(request.delete_services));
        let body = OperationRequest {
            process_type: ProcessType::Undeploy.as_str(),
            parameters,
        };
        self.submit_operation(space_guid, &body).await
    }

    async fn get_operation(
        &self,
        space_guid: &str,
        operation_id: &str,
    ) -> ApiResult<MtaOperationStatus> {
        let url = self.ds(&paths::deploy_service::operation(space_guid, operation_id));
        let op: OperationResponse = self
            .send_json("mta.operations.get", || {
                self.http.get(&url).query(&[("embed", "messages")])
            })
            .await?;
        let error = op
            .messages
            .iter()
            .rev()
            .find(|m| m.kind == "ERROR")
            .map(|m| m.text.clone());
        Ok(MtaOperationStatus {
            operation: Operation {
                id: Some(operation_id.to_string()),
                state: op.state.as_deref().map(|s| deploy_service_state(s).to_string()),
                error,
            },
            mta_id: op.mta_id,
        })
    }

    async fn get_mta(&self, space_guid: &str, mta_id: &str) -> ApiResult<Option<DeployedMta>> {
        let url = self.ds(&paths::deploy_service::mta(space_guid, mta_id));
        let mta = found(self.send_json::<Mta, _>("mta.get", || self.http.get(&url)).await)?;
        Ok(mta.map(|m| DeployedMta {
            id: m.metadata.id,
            version: m.metadata.version,
            modules: m.modules.into_iter().map(|m| m.module_name).collect(),
        }))
    }
}

#[async_trait]
impl NameLookup for CfClient {
    async fn org_guid_by_name(&self, name: &str) -> ApiResult<Option<String>> {
        let orgs: Vec<Organization> = self
            .list_all(
                "organizations.list",
                &self.cf(&paths::cf::organizations()),
                &[("names", name)],
            )
            .await?;
        Ok(orgs.into_iter().next().map(|o| o.guid))
    }

    async fn space_guid_by_name(
        &self,
        org_name: &str,
        space_name: &str,
    ) -> ApiResult<Option<String>> {
        let Some(org) = self.org_guid_by_name(org_name).await? else {
            return Ok(None);
        };
        let spaces: Vec<Space> = self
            .list_all(
                "spaces.list",
                &self.cf(&paths::cf::spaces()),
                &[("names", space_name), ("organization_guids", org.as_str())],
            )
            .await?;
        Ok(spaces.into_iter().next().map(|s| s.guid))
    }
}
