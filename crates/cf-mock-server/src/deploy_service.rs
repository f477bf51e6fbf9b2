//! MTA deploy-service v2 handlers
//!
//! Asynchronous file uploads are tracked as file jobs pinned to an app
//! instance; deploy and undeploy requests become operations that settle
//! after `polls_until_finished` reads.

use crate::errors::deploy_service_error_response;
use crate::store::{DeployedMta, FileJob, MockState, MtaOperation};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use base64::Engine;
use paths::deploy_service::APP_INSTANCE_HEADER;
use serde_json::{json, Value};
use tracing::{info, warn};

/// `POST /api/v2/spaces/{space}/files/async`
pub async fn upload_file_async(
    State(state): State<MockState>,
    Path(space): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(encoded) = body.get("file_url").and_then(Value::as_str) else {
        return deploy_service_error_response(StatusCode::BAD_REQUEST, "file_url is required");
    };
    let file_url = match base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    {
        Some(url) => url,
        None => {
            return deploy_service_error_response(
                StatusCode::BAD_REQUEST,
                "file_url must be base64 encoded",
            )
        }
    };

    let job = state.next_id("file-job");
    let file_id = state.next_id("file");
    let app_instance = format!("{}:0", state.next_id("app"));
    let polls_remaining = state.behaviour.read().await.polls_until_finished;
    info!("  Accepted async upload of {} as job {}", file_url, job);

    state.records.write().await.file_jobs.insert(
        job.clone(),
        FileJob {
            space: space.clone(),
            file_id,
            file_url,
            app_instance: app_instance.clone(),
            polls_remaining,
        },
    );

    (
        StatusCode::ACCEPTED,
        [
            (header::LOCATION.as_str(), paths::deploy_service::file_job(&space, &job)),
            (APP_INSTANCE_HEADER, app_instance),
        ],
    )
        .into_response()
}

/// `GET /api/v2/spaces/{space}/files/jobs/{job}`
pub async fn get_file_job(
    State(state): State<MockState>,
    Path((space, job)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let instance = headers
        .get(APP_INSTANCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut records = state.records.write().await;
    let Some(file_job) = records.file_jobs.get_mut(&job) else {
        return deploy_service_error_response(StatusCode::NOT_FOUND, "Job not found");
    };
    // Jobs live in the memory of the instance that accepted the upload
    if file_job.space != space || file_job.app_instance != instance {
        warn!("  File job {} requested from the wrong instance", job);
        return deploy_service_error_response(StatusCode::NOT_FOUND, "Job not found");
    }

    if file_job.polls_remaining > 0 {
        file_job.polls_remaining -= 1;
        return Json(json!({ "status": "RUNNING" })).into_response();
    }
    if !file_job.file_url.starts_with("http://") && !file_job.file_url.starts_with("https://") {
        return Json(json!({
            "status": "ERROR",
            "error": format!("Cannot fetch {}: unsupported scheme", file_job.file_url),
        }))
        .into_response();
    }

    let name = file_job
        .file_url
        .rsplit('/')
        .next()
        .unwrap_or("archive.mtar")
        .to_string();
    Json(json!({
        "status": "FINISHED",
        "file": {
            "id": file_job.file_id,
            "name": name,
            "space": space,
        },
    }))
    .into_response()
}

/// `POST /api/v2/spaces/{space}/files` (multipart, used for extension descriptors)
pub async fn upload_file(
    State(state): State<MockState>,
    Path(space): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut uploaded = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return deploy_service_error_response(StatusCode::BAD_REQUEST, e.to_string())
            }
        };
        let name = field.file_name().unwrap_or("extension.mtaext").to_string();
        let Ok(content) = field.text().await else {
            return deploy_service_error_response(StatusCode::BAD_REQUEST, "unreadable part");
        };
        let id = state.next_id("ext");
        state
            .records
            .write()
            .await
            .extensions
            .insert(id.clone(), content);
        uploaded.push(json!({ "id": id, "name": name, "space": space }));
    }
    if uploaded.is_empty() {
        return deploy_service_error_response(StatusCode::BAD_REQUEST, "no file part");
    }
    (StatusCode::CREATED, Json(Value::Array(uploaded))).into_response()
}

/// `POST /api/v2/spaces/{space}/operations`
pub async fn start_operation(
    State(state): State<MockState>,
    Path(space): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let process_type = body
        .get("processType")
        .and_then(Value::as_str)
        .unwrap_or("DEPLOY")
        .to_string();
    let parameters = body.get("parameters").cloned().unwrap_or(Value::Null);
    let behaviour = state.behaviour.read().await.clone();

    let modules = parameters
        .get("modulesForDeployment")
        .and_then(Value::as_array)
        .map(|m| {
            m.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_else(|| behaviour.mta_modules.clone());
    let mta_id = parameters
        .get("mtaId")
        .and_then(Value::as_str)
        .map_or_else(|| behaviour.mta_id.clone(), str::to_string);
    let error = if process_type == "UNDEPLOY" {
        None
    } else {
        behaviour.fail_deploys_with.clone()
    };

    let operation = state.next_id("op");
    let mut records = state.records.write().await;
    records.submitted.push(body.clone());
    records.operations.insert(
        operation.clone(),
        MtaOperation {
            space: space.clone(),
            process_type,
            mta_id,
            modules,
            namespace: parameters
                .get("namespace")
                .and_then(Value::as_str)
                .map(str::to_string),
            polls_remaining: behaviour.polls_until_finished,
            error,
        },
    );
    (
        StatusCode::ACCEPTED,
        [(
            header::LOCATION,
            format!(
                "{}?embed=messages",
                paths::deploy_service::operation(&space, &operation)
            ),
        )],
    )
        .into_response()
}

/// `GET /api/v2/spaces/{space}/operations/{operation}`
pub async fn get_operation(
    State(state): State<MockState>,
    Path((space, operation)): Path<(String, String)>,
) -> Response {
    let mut records = state.records.write().await;
    let Some(op) = records.operations.get_mut(&operation) else {
        return deploy_service_error_response(StatusCode::NOT_FOUND, "Operation not found");
    };
    if op.space != space {
        return deploy_service_error_response(StatusCode::NOT_FOUND, "Operation not found");
    }

    let (op_state, messages) = if op.polls_remaining > 0 {
        op.polls_remaining -= 1;
        ("RUNNING", json!([{ "id": 1, "text": "Processing", "type": "INFO" }]))
    } else if let Some(error) = &op.error {
        (
            "ERROR",
            json!([
                { "id": 1, "text": "Processing", "type": "INFO" },
                { "id": 2, "text": error, "type": "ERROR" },
            ]),
        )
    } else {
        ("FINISHED", json!([{ "id": 1, "text": "Process finished.", "type": "INFO" }]))
    };
    let op = op.clone();

    let response = json!({
        "processId": operation,
        "processType": op.process_type,
        "spaceId": space,
        "mtaId": op.mta_id,
        "state": op_state,
        "messages": messages,
    });

    if op_state == "FINISHED" {
        let key = (space.clone(), op.mta_id.clone());
        if op.process_type == "UNDEPLOY" {
            records.mtas.remove(&key);
        } else {
            let deployed = DeployedMta {
                modules: op.modules.clone(),
                namespace: op.namespace.clone(),
            };
            records.mtas.insert(key, deployed);
        }
    }
    Json(response).into_response()
}

/// `GET /api/v2/spaces/{space}/mtas/{mta}`
pub async fn get_mta(
    State(state): State<MockState>,
    Path((space, mta)): Path<(String, String)>,
) -> Response {
    let records = state.records.read().await;
    let Some(deployed) = records.mtas.get(&(space, mta.clone())) else {
        return deploy_service_error_response(StatusCode::NOT_FOUND, format!("MTA {mta} not found"));
    };
    let modules: Vec<Value> = deployed
        .modules
        .iter()
        .map(|m| json!({ "moduleName": m, "appName": m }))
        .collect();
    Json(json!({
        "metadata": { "id": mta, "version": "1.0.0", "namespace": deployed.namespace },
        "modules": modules,
        "services": [],
    }))
    .into_response()
}
