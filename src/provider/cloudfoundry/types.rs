//! # Wire Types
//!
//! Request and response bodies of the CF v3, UAA and deploy-service APIs.
//! Only the fields the controller reads are modelled; everything else is
//! ignored on decode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// `GET /` on the CF API
#[derive(Debug, Deserialize)]
pub struct RootInfo {
    pub links: RootLinks,
}

#[derive(Debug, Deserialize)]
pub struct RootLinks {
    #[serde(default)]
    pub login: Option<Link>,
    #[serde(default)]
    pub uaa: Option<Link>,
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// CF v3 error envelope
#[derive(Debug, Deserialize)]
pub struct CfErrors {
    pub errors: Vec<CfErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CfErrorDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl CfErrorDetail {
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref().or(self.title.as_deref())
    }
}

/// Deploy-service error envelope
#[derive(Debug, Deserialize)]
pub struct DeployServiceError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub resources: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> ListResponse<T> {
    pub fn next_page(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GuidRef {
    pub guid: String,
}

/// To-one relationship; `data` is `null` when unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToOne {
    #[serde(default)]
    pub data: Option<GuidRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToMany {
    #[serde(default)]
    pub data: Vec<GuidRef>,
}

#[derive(Debug, Deserialize)]
pub struct Organization {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Space {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub relationships: SpaceRelationships,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpaceRelationships {
    #[serde(default)]
    pub organization: ToOne,
}

#[derive(Debug, Deserialize)]
pub struct SshFeature {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct Domain {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub relationships: DomainRelationships,
}

#[derive(Debug, Default, Deserialize)]
pub struct DomainRelationships {
    #[serde(default)]
    pub organization: ToOne,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QuotaApps {
    pub total_memory_in_mb: Option<i64>,
    pub per_process_memory_in_mb: Option<i64>,
    pub total_instances: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QuotaServices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_services_allowed: Option<bool>,
    pub total_service_instances: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QuotaRoutes {
    pub total_routes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrgQuota {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub apps: QuotaApps,
    #[serde(default)]
    pub services: QuotaServices,
    #[serde(default)]
    pub routes: QuotaRoutes,
    #[serde(default)]
    pub relationships: QuotaRelationships,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuotaRelationships {
    #[serde(default)]
    pub organizations: ToMany,
}

/// Writable part of an organization quota
#[derive(Debug, Serialize)]
pub struct OrgQuotaBody<'a> {
    pub name: &'a str,
    pub apps: QuotaApps,
    pub services: QuotaServices,
    pub routes: QuotaRoutes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Role {
    pub guid: String,
    #[serde(default)]
    pub relationships: RoleRelationships,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleRelationships {
    #[serde(default)]
    pub user: ToOne,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub guid: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

/// `GET /v3/roles?include=user`
#[derive(Debug, Deserialize)]
pub struct RoleList {
    pub resources: Vec<Role>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub included: RoleIncluded,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleIncluded {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct Job {
    pub state: String,
    #[serde(default)]
    pub errors: Vec<CfErrorDetail>,
}

/// `GET .../files/jobs/{job}`
#[derive(Debug, Deserialize)]
pub struct FileJobResponse {
    pub status: String,
    #[serde(default)]
    pub file: Option<FileMetadata>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub process_type: &'static str,
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub mta_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<OperationMessage>,
}

#[derive(Debug, Deserialize)]
pub struct OperationMessage {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct Mta {
    pub metadata: MtaMetadata,
    #[serde(default)]
    pub modules: Vec<MtaModule>,
}

#[derive(Debug, Deserialize)]
pub struct MtaMetadata {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtaModule {
    pub module_name: String,
}
