//! In-memory collaborators for driving reconcile ticks without a cluster or
//! a Cloud Foundry foundation.

#![allow(dead_code)]

use async_trait::async_trait;
use cf_provider_controller::config::ControllerConfig;
use cf_provider_controller::controller::managed::ManagedKind;
use cf_provider_controller::controller::reconciler::store::apply_merge_patch;
use cf_provider_controller::controller::reconciler::tick::run_tick;
use cf_provider_controller::controller::reconciler::{ResourceStore, TickContext, TickOutcome};
use cf_provider_controller::controller::resolver::{RefKind, ReferenceStore, ReferencedResource};
use cf_provider_controller::controller::secrets::{SecretData, SecretReader};
use cf_provider_controller::crd::{Condition, Managed, Operation, Selector};
use cf_provider_controller::error::{Error, Result};
use cf_provider_controller::provider::{
    ApiError, ApiResult, CfDomain, CfOrgQuota, CfOrganization, CfRole, CfSpace, Connector,
    DeployRequest, DeployedMta, DomainApi, FileJob, FileUpload, JobApi, MtaApi,
    MtaOperationStatus, NameLookup, OrgQuotaApi, OrgQuotaLimits, OrganizationApi, Providers,
    RoleApi, SpaceApi, UndeployRequest,
};
use kube::Resource;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SPACE_GUID: &str = "5b0a9c6e-3f2d-4c1b-9a8e-7d6f5e4c3b2a";
pub const ORG_GUID: &str = "0f3e2d1c-4b5a-4968-8776-a5b4c3d2e1f0";

// --- Cloud Foundry ---

#[derive(Debug, Clone)]
struct PendingFile {
    space: String,
    url: String,
    file_id: String,
    error: Option<String>,
    polls_remaining: u32,
}

#[derive(Debug, Clone)]
enum OperationKind {
    Deploy { modules: Vec<String>, error: Option<String> },
    Undeploy,
}

#[derive(Debug, Clone)]
struct PendingOperation {
    space: String,
    mta_id: String,
    kind: OperationKind,
    polls_remaining: u32,
}

#[derive(Debug, Clone)]
pub struct AssignedRole {
    pub space: String,
    pub role_type: String,
    pub role: CfRole,
}

/// Everything the fake foundation holds
#[derive(Debug, Default)]
pub struct CfState {
    pub orgs: BTreeMap<String, CfOrganization>,
    pub spaces: BTreeMap<String, CfSpace>,
    pub ssh: BTreeMap<String, bool>,
    pub domains: BTreeMap<String, CfDomain>,
    pub quotas: BTreeMap<String, CfOrgQuota>,
    pub roles: Vec<AssignedRole>,
    /// Uploaded archive URLs, in submission order
    pub uploads: Vec<String>,
    /// Uploaded extension descriptors, in submission order
    pub extensions: Vec<String>,
    pub deploys: Vec<DeployRequest>,
    pub undeploys: Vec<UndeployRequest>,
    /// Deployed MTAs keyed by `(space, mta id)`
    pub mtas: BTreeMap<(String, String), DeployedMta>,
    /// Every provider call, in order
    pub calls: Vec<String>,
    file_jobs: HashMap<String, PendingFile>,
    operations: HashMap<String, PendingOperation>,
    sequence: u64,
}

impl CfState {
    fn next(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}{}", self.sequence)
    }

    fn next_guid(&mut self) -> String {
        self.sequence += 1;
        format!("00000000-0000-4000-8000-{:012x}", self.sequence)
    }
}

/// In-memory Cloud Foundry implementing every provider seam
#[derive(Debug)]
pub struct FakeCf {
    pub state: Mutex<CfState>,
    /// Reads a job or operation reports `RUNNING` before settling
    pub polls_until_finished: u32,
    /// The next deploy settles as failed with this message
    pub fail_next_deploy: Mutex<Option<String>>,
    /// Upload jobs of these URLs settle as failed with the mapped message
    pub failing_uploads: Mutex<HashMap<String, String>>,
    pub mta_id: String,
    /// Modules of an MTA deployed without a module selection
    pub modules: Vec<String>,
}

impl Default for FakeCf {
    fn default() -> Self {
        Self {
            state: Mutex::new(CfState::default()),
            polls_until_finished: 0,
            fail_next_deploy: Mutex::new(None),
            failing_uploads: Mutex::new(HashMap::new()),
            mta_id: "com.example.demo".to_string(),
            modules: vec!["web".to_string(), "srv".to_string()],
        }
    }
}

const MUTATING: [&str; 8] = [
    "create", "update", "delete", "apply", "set", "upload", "deploy", "undeploy",
];

impl FakeCf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polls(polls_until_finished: u32) -> Self {
        Self {
            polls_until_finished,
            ..Self::default()
        }
    }

    pub fn fail_next_deploy(&self, message: &str) {
        *self.fail_next_deploy.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_upload(&self, url: &str, message: &str) {
        self.failing_uploads
            .lock()
            .unwrap()
            .insert(url.to_string(), message.to_string());
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, CfState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that change the foundation
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATING.iter().any(|m| c.starts_with(m)))
            .collect()
    }

    pub fn deploys(&self) -> Vec<DeployRequest> {
        self.state.lock().unwrap().deploys.clone()
    }

    pub fn add_org(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let guid = state.next_guid();
        state.orgs.insert(
            guid.clone(),
            CfOrganization {
                guid: guid.clone(),
                name: name.to_string(),
                suspended: false,
                created_at: Some("2026-10-19T08:00:00Z".to_string()),
            },
        );
        guid
    }

    pub fn add_space(&self, guid: &str, name: &str, org_guid: &str) {
        self.state.lock().unwrap().spaces.insert(
            guid.to_string(),
            CfSpace {
                guid: guid.to_string(),
                name: name.to_string(),
                org_guid: org_guid.to_string(),
            },
        );
    }

    /// Give `username` a role outside the controller
    pub fn add_role(&self, space: &str, role_type: &str, username: &str, origin: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let guid = state.next_guid();
        state.roles.push(AssignedRole {
            space: space.to_string(),
            role_type: role_type.to_string(),
            role: CfRole {
                guid: guid.clone(),
                username: username.to_string(),
                origin: Some(origin.to_string()),
            },
        });
        guid
    }

    pub fn role_holders(&self, space: &str, role_type: &str) -> Vec<String> {
        let mut holders: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .roles
            .iter()
            .filter(|r| r.space == space && r.role_type == role_type)
            .map(|r| r.role.username.clone())
            .collect();
        holders.sort();
        holders
    }

    fn finished_job(state: &mut CfState) -> String {
        state.next("job")
    }
}

#[async_trait]
impl OrganizationApi for FakeCf {
    async fn get_organization(&self, guid: &str) -> ApiResult<Option<CfOrganization>> {
        Ok(self.record(format!("get_organization {guid}")).orgs.get(guid).cloned())
    }

    async fn create_organization(&self, name: &str, suspended: Option<bool>) -> ApiResult<CfOrganization> {
        let mut state = self.record(format!("create_organization {name}"));
        if state.orgs.values().any(|o| o.name == name) {
            return Err(ApiError::Permanent {
                message: format!("Organization '{name}' already exists."),
                status: Some(422),
            });
        }
        let guid = state.next_guid();
        let org = CfOrganization {
            guid: guid.clone(),
            name: name.to_string(),
            suspended: suspended.unwrap_or(false),
            created_at: Some("2026-10-19T08:00:00Z".to_string()),
        };
        state.orgs.insert(guid, org.clone());
        Ok(org)
    }

    async fn update_organization(
        &self,
        guid: &str,
        name: &str,
        suspended: Option<bool>,
    ) -> ApiResult<CfOrganization> {
        let mut state = self.record(format!("update_organization {guid}"));
        let org = state
            .orgs
            .get_mut(guid)
            .ok_or_else(|| ApiError::NotFound(format!("organization {guid}")))?;
        name.clone_into(&mut org.name);
        if let Some(suspended) = suspended {
            org.suspended = suspended;
        }
        Ok(org.clone())
    }

    async fn delete_organization(&self, guid: &str) -> ApiResult<Option<String>> {
        let mut state = self.record(format!("delete_organization {guid}"));
        state
            .orgs
            .remove(guid)
            .ok_or_else(|| ApiError::NotFound(format!("organization {guid}")))?;
        Ok(Some(Self::finished_job(&mut state)))
    }
}

#[async_trait]
impl SpaceApi for FakeCf {
    async fn get_space(&self, guid: &str) -> ApiResult<Option<CfSpace>> {
        Ok(self.record(format!("get_space {guid}")).spaces.get(guid).cloned())
    }

    async fn create_space(&self, name: &str, org_guid: &str) -> ApiResult<CfSpace> {
        let mut state = self.record(format!("create_space {name}"));
        if !state.orgs.contains_key(org_guid) {
            return Err(ApiError::Permanent {
                message: "Invalid organization.".to_string(),
                status: Some(422),
            });
        }
        let guid = state.next_guid();
        let space = CfSpace {
            guid: guid.clone(),
            name: name.to_string(),
            org_guid: org_guid.to_string(),
        };
        state.spaces.insert(guid.clone(), space.clone());
        state.ssh.insert(guid, true);
        Ok(space)
    }

    async fn update_space(&self, guid: &str, name: &str) -> ApiResult<CfSpace> {
        let mut state = self.record(format!("update_space {guid}"));
        let space = state
            .spaces
            .get_mut(guid)
            .ok_or_else(|| ApiError::NotFound(format!("space {guid}")))?;
        name.clone_into(&mut space.name);
        Ok(space.clone())
    }

    async fn delete_space(&self, guid: &str) -> ApiResult<Option<String>> {
        let mut state = self.record(format!("delete_space {guid}"));
        state
            .spaces
            .remove(guid)
            .ok_or_else(|| ApiError::NotFound(format!("space {guid}")))?;
        Ok(Some(Self::finished_job(&mut state)))
    }

    async fn get_space_ssh(&self, guid: &str) -> ApiResult<bool> {
        let state = self.record(format!("get_space_ssh {guid}"));
        state
            .ssh
            .get(guid)
            .copied()
            .ok_or_else(|| ApiError::NotFound(format!("space {guid}")))
    }

    async fn set_space_ssh(&self, guid: &str, enabled: bool) -> ApiResult<()> {
        self.record(format!("set_space_ssh {guid} {enabled}"))
            .ssh
            .insert(guid.to_string(), enabled);
        Ok(())
    }
}

#[async_trait]
impl DomainApi for FakeCf {
    async fn get_domain(&self, guid: &str) -> ApiResult<Option<CfDomain>> {
        Ok(self.record(format!("get_domain {guid}")).domains.get(guid).cloned())
    }

    async fn create_domain(
        &self,
        name: &str,
        internal: Option<bool>,
        org_guid: Option<&str>,
    ) -> ApiResult<CfDomain> {
        let mut state = self.record(format!("create_domain {name}"));
        let guid = state.next_guid();
        let domain = CfDomain {
            guid: guid.clone(),
            name: name.to_string(),
            internal: internal.unwrap_or(false),
            org_guid: org_guid.map(str::to_string),
        };
        state.domains.insert(guid, domain.clone());
        Ok(domain)
    }

    async fn delete_domain(&self, guid: &str) -> ApiResult<Option<String>> {
        let mut state = self.record(format!("delete_domain {guid}"));
        state
            .domains
            .remove(guid)
            .ok_or_else(|| ApiError::NotFound(format!("domain {guid}")))?;
        Ok(Some(Self::finished_job(&mut state)))
    }
}

#[async_trait]
impl OrgQuotaApi for FakeCf {
    async fn get_org_quota(&self, guid: &str) -> ApiResult<Option<CfOrgQuota>> {
        Ok(self.record(format!("get_org_quota {guid}")).quotas.get(guid).cloned())
    }

    async fn create_org_quota(&self, limits: &OrgQuotaLimits, orgs: &[String]) -> ApiResult<CfOrgQuota> {
        let mut state = self.record(format!("create_org_quota {}", limits.name));
        let guid = state.next_guid();
        let quota = CfOrgQuota {
            guid: guid.clone(),
            limits: limits.clone(),
            orgs: orgs.to_vec(),
        };
        state.quotas.insert(guid, quota.clone());
        Ok(quota)
    }

    async fn update_org_quota(&self, guid: &str, limits: &OrgQuotaLimits) -> ApiResult<CfOrgQuota> {
        let mut state = self.record(format!("update_org_quota {guid}"));
        let quota = state
            .quotas
            .get_mut(guid)
            .ok_or_else(|| ApiError::NotFound(format!("organization quota {guid}")))?;
        quota.limits = limits.clone();
        Ok(quota.clone())
    }

    async fn apply_org_quota(&self, guid: &str, orgs: &[String]) -> ApiResult<()> {
        let mut state = self.record(format!("apply_org_quota {guid} {}", orgs.join(",")));
        let quota = state
            .quotas
            .get_mut(guid)
            .ok_or_else(|| ApiError::NotFound(format!("organization quota {guid}")))?;
        for org in orgs {
            if !quota.orgs.contains(org) {
                quota.orgs.push(org.clone());
            }
        }
        Ok(())
    }

    async fn delete_org_quota(&self, guid: &str) -> ApiResult<Option<String>> {
        let mut state = self.record(format!("delete_org_quota {guid}"));
        state
            .quotas
            .remove(guid)
            .ok_or_else(|| ApiError::NotFound(format!("organization quota {guid}")))?;
        Ok(Some(Self::finished_job(&mut state)))
    }
}

#[async_trait]
impl RoleApi for FakeCf {
    async fn list_space_roles(&self, space_guid: &str, role_type: &str) -> ApiResult<Vec<CfRole>> {
        let state = self.record(format!("list_space_roles {space_guid} {role_type}"));
        Ok(state
            .roles
            .iter()
            .filter(|r| r.space == space_guid && r.role_type == role_type)
            .map(|r| r.role.clone())
            .collect())
    }

    async fn create_space_role(
        &self,
        space_guid: &str,
        role_type: &str,
        username: &str,
        origin: &str,
    ) -> ApiResult<CfRole> {
        let mut state = self.record(format!("create_space_role {role_type} {username}"));
        let guid = state.next_guid();
        let role = CfRole {
            guid,
            username: username.to_string(),
            origin: Some(origin.to_string()),
        };
        state.roles.push(AssignedRole {
            space: space_guid.to_string(),
            role_type: role_type.to_string(),
            role: role.clone(),
        });
        Ok(role)
    }

    async fn delete_role(&self, guid: &str) -> ApiResult<Option<String>> {
        let mut state = self.record(format!("delete_role {guid}"));
        let before = state.roles.len();
        state.roles.retain(|r| r.role.guid != guid);
        if state.roles.len() == before {
            return Err(ApiError::NotFound(format!("role {guid}")));
        }
        Ok(Some(Self::finished_job(&mut state)))
    }
}

#[async_trait]
impl JobApi for FakeCf {
    async fn get_job(&self, job_id: &str) -> ApiResult<Operation> {
        drop(self.record(format!("get_job {job_id}")));
        Ok(Operation {
            id: Some(job_id.to_string()),
            state: Some("FINISHED".to_string()),
            error: None,
        })
    }
}

#[async_trait]
impl MtaApi for FakeCf {
    async fn upload_file(&self, space_guid: &str, url: &str) -> ApiResult<FileUpload> {
        let error = self.failing_uploads.lock().unwrap().get(url).cloned();
        let mut state = self.record(format!("upload_file {url}"));
        let job_id = state.next("j");
        let file_id = state.next("f");
        state.uploads.push(url.to_string());
        state.file_jobs.insert(
            job_id.clone(),
            PendingFile {
                space: space_guid.to_string(),
                url: url.to_string(),
                file_id,
                error,
                polls_remaining: self.polls_until_finished,
            },
        );
        Ok(FileUpload {
            job_id,
            app_instance: Some("app-0:0".to_string()),
        })
    }

    async fn get_file_job(
        &self,
        space_guid: &str,
        job_id: &str,
        app_instance: Option<&str>,
    ) -> ApiResult<FileJob> {
        let mut state = self.record(format!("get_file_job {job_id}"));
        let job = state
            .file_jobs
            .get_mut(job_id)
            .filter(|j| j.space == space_guid && app_instance == Some("app-0:0"))
            .ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;
        if job.polls_remaining > 0 {
            job.polls_remaining -= 1;
            return Ok(FileJob {
                operation: Operation::running(job_id),
                file_id: None,
            });
        }
        if let Some(error) = job.error.clone() {
            return Ok(FileJob {
                operation: Operation {
                    id: Some(job_id.to_string()),
                    state: Some("FAILED".to_string()),
                    error: Some(error),
                },
                file_id: None,
            });
        }
        Ok(FileJob {
            operation: Operation {
                id: Some(job_id.to_string()),
                state: Some("FINISHED".to_string()),
                error: None,
            },
            file_id: Some(job.file_id.clone()),
        })
    }

    async fn upload_extension(&self, _space_guid: &str, descriptor: &str) -> ApiResult<String> {
        let mut state = self.record("upload_extension".to_string());
        state.extensions.push(descriptor.to_string());
        Ok(state.next("e"))
    }

    async fn deploy(&self, space_guid: &str, request: &DeployRequest) -> ApiResult<String> {
        let error = self.fail_next_deploy.lock().unwrap().take();
        let mut state = self.record(format!("deploy {}", request.process_type.as_str()));
        let op_id = state.next("op");
        state.deploys.push(request.clone());
        state.operations.insert(
            op_id.clone(),
            PendingOperation {
                space: space_guid.to_string(),
                mta_id: self.mta_id.clone(),
                kind: OperationKind::Deploy {
                    modules: request.modules.clone().unwrap_or_else(|| self.modules.clone()),
                    error,
                },
                polls_remaining: self.polls_until_finished,
            },
        );
        Ok(op_id)
    }

    async fn undeploy(&self, space_guid: &str, request: &UndeployRequest) -> ApiResult<String> {
        let mut state = self.record(format!("undeploy {}", request.mta_id));
        if !state
            .mtas
            .contains_key(&(space_guid.to_string(), request.mta_id.clone()))
        {
            return Err(ApiError::NotFound(format!("MTA {}", request.mta_id)));
        }
        let op_id = state.next("op");
        state.undeploys.push(request.clone());
        state.operations.insert(
            op_id.clone(),
            PendingOperation {
                space: space_guid.to_string(),
                mta_id: request.mta_id.clone(),
                kind: OperationKind::Undeploy,
                polls_remaining: 0,
            },
        );
        Ok(op_id)
    }

    async fn get_operation(&self, space_guid: &str, operation_id: &str) -> ApiResult<MtaOperationStatus> {
        let mut state = self.record(format!("get_operation {operation_id}"));
        let op = state
            .operations
            .get_mut(operation_id)
            .filter(|op| op.space == space_guid)
            .ok_or_else(|| ApiError::NotFound(format!("operation {operation_id}")))?;
        if op.polls_remaining > 0 {
            op.polls_remaining -= 1;
            return Ok(MtaOperationStatus {
                operation: Operation::running(operation_id),
                mta_id: None,
            });
        }
        let op = op.clone();
        let key = (op.space.clone(), op.mta_id.clone());
        let (state_name, error) = match op.kind {
            OperationKind::Deploy {
                error: Some(error), ..
            } => ("FAILED", Some(error)),
            OperationKind::Deploy { modules, error: None } => {
                state.mtas.insert(
                    key,
                    DeployedMta {
                        id: op.mta_id.clone(),
                        version: Some("1.0.0".to_string()),
                        modules,
                    },
                );
                ("FINISHED", None)
            }
            OperationKind::Undeploy => {
                state.mtas.remove(&key);
                ("FINISHED", None)
            }
        };
        Ok(MtaOperationStatus {
            operation: Operation {
                id: Some(operation_id.to_string()),
                state: Some(state_name.to_string()),
                error,
            },
            mta_id: Some(op.mta_id),
        })
    }

    async fn get_mta(&self, space_guid: &str, mta_id: &str) -> ApiResult<Option<DeployedMta>> {
        Ok(self
            .record(format!("get_mta {mta_id}"))
            .mtas
            .get(&(space_guid.to_string(), mta_id.to_string()))
            .cloned())
    }
}

#[async_trait]
impl NameLookup for FakeCf {
    async fn org_guid_by_name(&self, name: &str) -> ApiResult<Option<String>> {
        let state = self.record(format!("org_guid_by_name {name}"));
        Ok(state.orgs.values().find(|o| o.name == name).map(|o| o.guid.clone()))
    }

    async fn space_guid_by_name(&self, org_name: &str, space_name: &str) -> ApiResult<Option<String>> {
        let state = self.record(format!("space_guid_by_name {org_name} {space_name}"));
        let Some(org) = state.orgs.values().find(|o| o.name == org_name) else {
            return Ok(None);
        };
        Ok(state
            .spaces
            .values()
            .find(|s| s.org_guid == org.guid && s.name == space_name)
            .map(|s| s.guid.clone()))
    }
}

/// Hands out the same fake for every provider config
pub struct StaticConnector(pub Arc<FakeCf>);

#[async_trait]
impl Connector for StaticConnector {
    async fn connect(&self, _provider_config: &str) -> Result<Providers> {
        Ok(Providers::from_client(Arc::clone(&self.0)))
    }
}

// --- Kubernetes ---

/// Managed resources as JSON, with merge patches and optimistic concurrency
pub struct FakeStore<K> {
    objects: Mutex<BTreeMap<String, Value>>,
    writes: AtomicUsize,
    kind: PhantomData<fn() -> K>,
}

impl<K: Managed> Default for FakeStore<K> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
            kind: PhantomData,
        }
    }
}

fn resource_version(object: &Value) -> u64 {
    object
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

impl<K: Managed> FakeStore<K> {
    pub fn insert(&self, resource: &K) {
        let mut object = serde_json::to_value(resource).unwrap();
        object["metadata"]["resourceVersion"] = json!("1");
        object["metadata"]["generation"] = json!(1);
        let name = object["metadata"]["name"].as_str().unwrap().to_string();
        self.objects.lock().unwrap().insert(name, object);
    }

    pub fn get(&self, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .map(|o| serde_json::from_value(o.clone()).unwrap())
    }

    pub fn json(&self, name: &str) -> Option<Value> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    /// Writes accepted so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Edit the spec the way a user would
    pub fn edit(&self, name: &str, edit: impl FnOnce(&mut K)) {
        let mut objects = self.objects.lock().unwrap();
        let object = objects.get_mut(name).unwrap();
        let mut resource: K = serde_json::from_value(object.clone()).unwrap();
        edit(&mut resource);
        let version = resource_version(object) + 1;
        let generation = object["metadata"]["generation"].as_i64().unwrap_or(1) + 1;
        *object = serde_json::to_value(&resource).unwrap();
        object["metadata"]["resourceVersion"] = json!(version.to_string());
        object["metadata"]["generation"] = json!(generation);
    }

    /// Request deletion; the object goes away once its finalizers are gone
    pub fn delete(&self, name: &str) {
        let mut objects = self.objects.lock().unwrap();
        let object = objects.get_mut(name).unwrap();
        let finalized = object
            .pointer("/metadata/finalizers")
            .and_then(Value::as_array)
            .is_none_or(Vec::is_empty);
        if finalized {
            objects.remove(name);
            return;
        }
        let version = resource_version(object) + 1;
        object["metadata"]["deletionTimestamp"] = json!("2026-10-19T09:00:00Z");
        object["metadata"]["resourceVersion"] = json!(version.to_string());
    }

    fn apply(&self, name: &str, patch: &Value, subresource: bool) -> Result<K> {
        let mut objects = self.objects.lock().unwrap();
        let Some(object) = objects.get_mut(name) else {
            return Err(Error::permanent(format!("{name} not found")));
        };
        let current = resource_version(object);
        if let Some(expected) = patch.pointer("/metadata/resourceVersion").and_then(Value::as_str) {
            if expected != current.to_string() {
                return Err(Error::conflict(format!(
                    "{name} was modified: expected version {expected}, found {current}"
                )));
            }
        }

        let mut patch = patch.clone();
        if let Some(metadata) = patch.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.remove("resourceVersion");
        }
        if let Some(fields) = patch.as_object_mut() {
            if subresource {
                fields.retain(|key, _| key == "status");
            } else {
                fields.remove("status");
            }
        }
        apply_merge_patch(object, &patch);
        object["metadata"]["resourceVersion"] = json!((current + 1).to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);

        let resource: K = serde_json::from_value(object.clone()).unwrap();
        let deleting = object.pointer("/metadata/deletionTimestamp").is_some();
        if deleting && resource.meta().finalizers.as_ref().is_none_or(Vec::is_empty) {
            objects.remove(name);
        }
        Ok(resource)
    }
}

#[async_trait]
impl<K: Managed> ResourceStore<K> for FakeStore<K> {
    async fn patch(&self, name: &str, patch: &Value) -> Result<K> {
        self.apply(name, patch, false)
    }

    async fn patch_status(&self, name: &str, patch: &Value) -> Result<K> {
        self.apply(name, patch, true)
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub kind: RefKind,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub external_name: Option<String>,
}

/// Organization and Space resources other resources may reference
#[derive(Default)]
pub struct FakeReferences {
    pub entries: Mutex<Vec<ReferenceEntry>>,
}

impl FakeReferences {
    pub fn add(&self, kind: RefKind, name: &str, labels: &[(&str, &str)], external_name: Option<&str>) {
        self.entries.lock().unwrap().push(ReferenceEntry {
            kind,
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            external_name: external_name.map(str::to_string),
        });
    }
}

fn referenced(entry: &ReferenceEntry) -> ReferencedResource {
    ReferencedResource {
        name: entry.name.clone(),
        external_name: entry.external_name.clone(),
    }
}

#[async_trait]
impl ReferenceStore for FakeReferences {
    async fn get(&self, kind: RefKind, name: &str) -> Result<Option<ReferencedResource>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.kind == kind && e.name == name)
            .map(referenced))
    }

    async fn select(&self, kind: RefKind, selector: &Selector) -> Result<Vec<ReferencedResource>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.kind == kind
                    && selector
                        .match_labels
                        .iter()
                        .all(|(k, v)| e.labels.get(k) == Some(v))
            })
            .map(referenced)
            .collect())
    }
}

#[derive(Default)]
pub struct FakeSecrets {
    pub secrets: Mutex<HashMap<(String, String), SecretData>>,
}

impl FakeSecrets {
    pub fn add(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        let secret = SecretData {
            resource_version: Some("1".to_string()),
            data: data
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.as_bytes().to_vec()))
                .collect(),
        };
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), secret);
    }
}

#[async_trait]
impl SecretReader for FakeSecrets {
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Option<SecretData>> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

// --- harness ---

/// One kind's controller wired to in-memory collaborators
pub struct Harness<K> {
    pub cf: Arc<FakeCf>,
    pub connector: StaticConnector,
    pub references: FakeReferences,
    pub secrets: Arc<FakeSecrets>,
    pub store: FakeStore<K>,
    pub config: ControllerConfig,
}

impl<K: ManagedKind> Harness<K> {
    pub fn new(cf: FakeCf) -> Self {
        let cf = Arc::new(cf);
        Self {
            connector: StaticConnector(Arc::clone(&cf)),
            cf,
            references: FakeReferences::default(),
            secrets: Arc::new(FakeSecrets::default()),
            store: FakeStore::default(),
            config: ControllerConfig::default(),
        }
    }

    /// Run one tick over the stored resource
    pub async fn tick(&self, name: &str) -> Result<TickOutcome> {
        let resource = self
            .store
            .get(name)
            .unwrap_or_else(|| panic!("{name} is not stored"));
        self.tick_resource(resource).await
    }

    /// Run one tick over a possibly stale copy of the resource
    pub async fn tick_resource(&self, resource: K) -> Result<TickOutcome> {
        let ctx = TickContext {
            connector: &self.connector,
            references: &self.references,
            secrets: Arc::clone(&self.secrets) as Arc<dyn SecretReader>,
            store: &self.store,
            config: &self.config,
        };
        run_tick(&ctx, resource).await
    }

    /// Tick until `Ready=True`, failing after `max_ticks`
    pub async fn tick_until_ready(&self, name: &str, max_ticks: usize) -> usize {
        for n in 1..=max_ticks {
            self.tick(name).await.unwrap();
            if condition(&self.store.get(name).unwrap(), "Ready").is_some_and(|c| c.is_true()) {
                return n;
            }
        }
        panic!("{name} not ready after {max_ticks} ticks");
    }
}

pub fn condition<K: Managed>(resource: &K, r#type: &str) -> Option<Condition> {
    resource
        .managed_status()
        .and_then(|s| s.condition(r#type))
        .cloned()
}
