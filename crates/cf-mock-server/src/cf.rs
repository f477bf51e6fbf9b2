//! Cloud Foundry v3 handlers
//!
//! Covers the subset of `/v3` used by the controller: organizations,
//! spaces (plus the ssh feature), domains, organization quotas, roles and
//! jobs. Deletes answer `202 Accepted` with a job `Location`.

use crate::errors::cf_error_response;
use crate::store::MockState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

fn list_response(resources: Vec<Value>) -> Response {
    Json(json!({
        "pagination": { "total_results": resources.len(), "total_pages": 1, "next": null },
        "resources": resources,
    }))
    .into_response()
}

/// Values of a comma-separated filter such as `names=a,b`
fn filter_values(query: &HashMap<String, String>, key: &str) -> Option<Vec<String>> {
    query
        .get(key)
        .map(|v| v.split(',').map(str::to_string).collect())
}

fn matches_filter(value: &Value, pointer: &str, filter: Option<&Vec<String>>) -> bool {
    filter.is_none_or(|wanted| {
        value
            .pointer(pointer)
            .and_then(Value::as_str)
            .is_some_and(|v| wanted.iter().any(|w| w == v))
    })
}

async fn accepted_job(state: &MockState) -> Response {
    let job = state.next_id("job");
    let polls = state.behaviour.read().await.polls_until_finished;
    state.records.write().await.cf_jobs.insert(job.clone(), polls);
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, paths::cf::job(&job))],
    )
        .into_response()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// --- jobs ---

pub async fn get_job(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    let mut records = state.records.write().await;
    let Some(remaining) = records.cf_jobs.get_mut(&guid) else {
        return cf_error_response(StatusCode::NOT_FOUND, format!("Job {guid} not found"));
    };
    let job_state = if *remaining > 0 {
        *remaining -= 1;
        "PROCESSING"
    } else {
        "COMPLETE"
    };
    Json(json!({ "guid": guid, "state": job_state, "errors": [] })).into_response()
}

// --- organizations ---

pub async fn list_organizations(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let names = filter_values(&query, "names");
    let records = state.records.read().await;
    let resources = records
        .organizations
        .values()
        .filter(|o| matches_filter(o, "/name", names.as_ref()))
        .cloned()
        .collect();
    list_response(resources)
}

pub async fn get_organization(
    State(state): State<MockState>,
    Path(guid): Path<String>,
) -> Response {
    match state.records.read().await.organizations.get(&guid) {
        Some(org) => Json(org.clone()).into_response(),
        None => cf_error_response(StatusCode::NOT_FOUND, "Organization not found"),
    }
}

pub async fn create_organization(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Response {
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return cf_error_response(StatusCode::UNPROCESSABLE_ENTITY, "Name must be a string");
    };
    let mut records = state.records.write().await;
    if records
        .organizations
        .values()
        .any(|o| o["name"].as_str() == Some(name))
    {
        return cf_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Organization '{name}' already exists."),
        );
    }
    let guid = state.next_id("org");
    let org = json!({
        "guid": guid,
        "name": name,
        "suspended": body.get("suspended").and_then(Value::as_bool).unwrap_or(false),
        "created_at": now(),
    });
    records.organizations.insert(guid.clone(), org.clone());
    info!("  Created organization {} ({})", name, guid);
    (StatusCode::CREATED, Json(org)).into_response()
}

pub async fn update_organization(
    State(state): State<MockState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut records = state.records.write().await;
    let Some(org) = records.organizations.get_mut(&guid) else {
        return cf_error_response(StatusCode::NOT_FOUND, "Organization not found");
    };
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        org["name"] = json!(name);
    }
    if let Some(suspended) = body.get("suspended").and_then(Value::as_bool) {
        org["suspended"] = json!(suspended);
    }
    Json(org.clone()).into_response()
}

pub async fn delete_organization(
    State(state): State<MockState>,
    Path(guid): Path<String>,
) -> Response {
    if state
        .records
        .write()
        .await
        .organizations
        .remove(&guid)
        .is_none()
    {
        return cf_error_response(StatusCode::NOT_FOUND, "Organization not found");
    }
    accepted_job(&state).await
}

// --- spaces ---

pub async fn list_spaces(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let names = filter_values(&query, "names");
    let orgs = filter_values(&query, "organization_guids");
    let records = state.records.read().await;
    let resources = records
        .spaces
        .values()
        .filter(|s| matches_filter(s, "/name", names.as_ref()))
        .filter(|s| {
            matches_filter(s, "/relationships/organization/data/guid", orgs.as_ref())
        })
        .cloned()
        .collect();
    list_response(resources)
}

pub async fn get_space(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    match state.records.read().await.spaces.get(&guid) {
        Some(space) => Json(space.clone()).into_response(),
        None => cf_error_response(StatusCode::NOT_FOUND, "Space not found"),
    }
}

pub async fn create_space(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let name = body.get("name").and_then(Value::as_str);
    let org = body
        .pointer("/relationships/organization/data/guid")
        .and_then(Value::as_str);
    let (Some(name), Some(org)) = (name, org) else {
        return cf_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Name and organization relationship are required",
        );
    };
    let mut records = state.records.write().await;
    if !records.organizations.contains_key(org) {
        return cf_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid organization. Ensure the organization exists and you have access to it.",
        );
    }
    let guid = state.next_id("space");
    let space = json!({
        "guid": guid,
        "name": name,
        "created_at": now(),
        "relationships": { "organization": { "data": { "guid": org } } },
    });
    records.spaces.insert(guid.clone(), space.clone());
    records.space_ssh.insert(guid.clone(), true);
    info!("  Created space {} ({}) in org {}", name, guid, org);
    (StatusCode::CREATED, Json(space)).into_response()
}

pub async fn update_space(
    State(state): State<MockState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut records = state.records.write().await;
    let Some(space) = records.spaces.get_mut(&guid) else {
        return cf_error_response(StatusCode::NOT_FOUND, "Space not found");
    };
    if let Some(name) = body.get("name").and_then(Value::as_str) {
        space["name"] = json!(name);
    }
    Json(space.clone()).into_response()
}

pub async fn delete_space(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    let removed = {
        let mut records = state.records.write().await;
        records.space_ssh.remove(&guid);
        records.spaces.remove(&guid)
    };
    if removed.is_none() {
        return cf_error_response(StatusCode::NOT_FOUND, "Space not found");
    }
    accepted_job(&state).await
}

pub async fn get_space_ssh(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    match state.records.read().await.space_ssh.get(&guid) {
        Some(enabled) => Json(json!({
            "name": "ssh",
            "description": "Enable SSHing into apps in the space.",
            "enabled": enabled,
        }))
        .into_response(),
        None => cf_error_response(StatusCode::NOT_FOUND, "Space not found"),
    }
}

pub async fn update_space_ssh(
    State(state): State<MockState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut records = state.records.write().await;
    let Some(enabled) = records.space_ssh.get_mut(&guid) else {
        return cf_error_response(StatusCode::NOT_FOUND, "Space not found");
    };
    if let Some(value) = body.get("enabled").and_then(Value::as_bool) {
        *enabled = value;
    }
    Json(json!({ "name": "ssh", "enabled": *enabled })).into_response()
}

// --- domains ---

pub async fn get_domain(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    match state.records.read().await.domains.get(&guid) {
        Some(domain) => Json(domain.clone()).into_response(),
        None => cf_error_response(StatusCode::NOT_FOUND, "Domain not found"),
    }
}

pub async fn create_domain(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return cf_error_response(StatusCode::UNPROCESSABLE_ENTITY, "Name must be a string");
    };
    let guid = state.next_id("domain");
    let org = body
        .pointer("/relationships/organization/data")
        .cloned()
        .unwrap_or(Value::Null);
    let domain = json!({
        "guid": guid,
        "name": name,
        "internal": body.get("internal").and_then(Value::as_bool).unwrap_or(false),
        "relationships": { "organization": { "data": org } },
    });
    state
        .records
        .write()
        .await
        .domains
        .insert(guid, domain.clone());
    (StatusCode::CREATED, Json(domain)).into_response()
}

pub async fn delete_domain(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    if state.records.write().await.domains.remove(&guid).is_none() {
        return cf_error_response(StatusCode::NOT_FOUND, "Domain not found");
    }
    accepted_job(&state).await
}

// --- organization quotas ---

pub async fn get_org_quota(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    match state.records.read().await.org_quotas.get(&guid) {
        Some(quota) => Json(quota.clone()).into_response(),
        None => cf_error_response(StatusCode::NOT_FOUND, "Organization quota not found"),
    }
}

/// Overlay the writable sections of a quota request onto a stored quota
fn merge_quota(quota: &mut Value, body: &Value) {
    if let Some(name) = body.get("name") {
        quota["name"] = name.clone();
    }
    for section in ["apps", "services", "routes"] {
        if let Some(fields) = body.get(section).and_then(Value::as_object) {
            for (key, value) in fields {
                quota[section][key] = value.clone();
            }
        }
    }
}

pub async fn create_org_quota(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Response {
    let guid = state.next_id("quota");
    let mut quota = json!({
        "guid": guid,
        "name": "",
        "apps": {
            "total_memory_in_mb": null,
            "per_process_memory_in_mb": null,
            "total_instances": null,
        },
        "services": { "paid_services_allowed": true, "total_service_instances": null },
        "routes": { "total_routes": null },
        "relationships": { "organizations": { "data": [] } },
    });
    merge_quota(&mut quota, &body);
    if let Some(orgs) = body.pointer("/relationships/organizations/data") {
        quota["relationships"]["organizations"]["data"] = orgs.clone();
    }
    state
        .records
        .write()
        .await
        .org_quotas
        .insert(guid, quota.clone());
    (StatusCode::CREATED, Json(quota)).into_response()
}

pub async fn update_org_quota(
    State(state): State<MockState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut records = state.records.write().await;
    let Some(quota) = records.org_quotas.get_mut(&guid) else {
        return cf_error_response(StatusCode::NOT_FOUND, "Organization quota not found");
    };
    merge_quota(quota, &body);
    Json(quota.clone()).into_response()
}

pub async fn apply_org_quota(
    State(state): State<MockState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut records = state.records.write().await;
    let Some(quota) = records.org_quotas.get_mut(&guid) else {
        return cf_error_response(StatusCode::NOT_FOUND, "Organization quota not found");
    };
    let data = &mut quota["relationships"]["organizations"]["data"];
    if let (Some(existing), Some(added)) = (
        data.as_array_mut(),
        body.get("data").and_then(Value::as_array),
    ) {
        for org in added {
            if !existing.contains(org) {
                existing.push(org.clone());
            }
        }
    }
    Json(json!({ "data": data.clone() })).into_response()
}

pub async fn delete_org_quota(
    State(state): State<MockState>,
    Path(guid): Path<String>,
) -> Response {
    if state.records.write().await.org_quotas.remove(&guid).is_none() {
        return cf_error_response(StatusCode::NOT_FOUND, "Organization quota not found");
    }
    accepted_job(&state).await
}

// --- roles ---

pub async fn list_roles(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let types = filter_values(&query, "types");
    let spaces = filter_values(&query, "space_guids");
    let records = state.records.read().await;
    let roles: Vec<Value> = records
        .roles
        .values()
        .filter(|r| matches_filter(r, "/type", types.as_ref()))
        .filter(|r| matches_filter(r, "/relationships/space/data/guid", spaces.as_ref()))
        .cloned()
        .collect();
    let users: Vec<Value> = roles
        .iter()
        .filter_map(|r| r.pointer("/relationships/user/data/guid").and_then(Value::as_str))
        .filter_map(|guid| records.users.get(guid).cloned())
        .collect();
    Json(json!({
        "pagination": { "total_results": roles.len(), "total_pages": 1, "next": null },
        "resources": roles,
        "included": { "users": users },
    }))
    .into_response()
}

pub async fn create_role(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let role_type = body.get("type").and_then(Value::as_str).unwrap_or_default();
    let username = body
        .pointer("/relationships/user/data/username")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let origin = body
        .pointer("/relationships/user/data/origin")
        .and_then(Value::as_str)
        .unwrap_or("uaa");
    let space = body
        .pointer("/relationships/space/data/guid")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let existing_user = state
        .records
        .read()
        .await
        .users
        .values()
        .find(|u| u["username"] == username && u["origin"] == origin)
        .and_then(|u| u["guid"].as_str().map(str::to_string));
    let user_guid = match existing_user {
        Some(guid) => guid,
        None => state.add_user(username, origin).await,
    };

    let mut records = state.records.write().await;
    let duplicate = records.roles.values().any(|r| {
        r["type"] == role_type
            && r.pointer("/relationships/user/data/guid").and_then(Value::as_str)
                == Some(user_guid.as_str())
            && r.pointer("/relationships/space/data/guid").and_then(Value::as_str) == Some(space)
    });
    if duplicate {
        return cf_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("User '{username}' already has '{role_type}' role in space '{space}'."),
        );
    }
    let guid = state.next_id("role");
    let role = json!({
        "guid": guid,
        "type": role_type,
        "relationships": {
            "user": { "data": { "guid": user_guid } },
            "space": { "data": { "guid": space } },
        },
    });
    records.roles.insert(guid, role.clone());
    (StatusCode::CREATED, Json(role)).into_response()
}

pub async fn delete_role(State(state): State<MockState>, Path(guid): Path<String>) -> Response {
    if state.records.write().await.roles.remove(&guid).is_none() {
        return cf_error_response(StatusCode::NOT_FOUND, "Role not found");
    }
    accepted_job(&state).await
}
