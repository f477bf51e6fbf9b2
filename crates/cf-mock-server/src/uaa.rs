//! CF API root document and UAA password-grant token endpoint

use crate::errors::cf_error_response;
use crate::store::MockState;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::Form;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// Seconds until an issued token expires
const TOKEN_TTL_SECS: u64 = 3600;

/// `GET /` advertises this server as its own login/UAA endpoint
pub async fn api_root(headers: HeaderMap) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let base = format!("http://{host}");
    Json(json!({
        "links": {
            "self": { "href": base },
            "login": { "href": base },
            "uaa": { "href": base },
        }
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    grant_type: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// `POST /oauth/token`
pub async fn token(State(state): State<MockState>, Form(request): Form<TokenRequest>) -> Response {
    state.token_requests.fetch_add(1, Ordering::Relaxed);
    let behaviour = state.behaviour.read().await.clone();

    if request.grant_type != "password"
        || request.username != behaviour.username
        || request.password != behaviour.password
    {
        warn!("  Rejected token request for user {}", request.username);
        return cf_error_response(StatusCode::UNAUTHORIZED, "Bad credentials");
    }

    let token = state.next_id("mock-token");
    state.records.write().await.tokens.push(token.clone());
    info!("  Issued token for {}", request.username);

    Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": TOKEN_TTL_SECS,
        "scope": "cloud_controller.admin",
    }))
    .into_response()
}
