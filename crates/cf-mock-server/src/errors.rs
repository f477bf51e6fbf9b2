//! API-specific error response formatting
//!
//! - CF v3: `{"errors": [{"code": 10010, "title": "CF-ResourceNotFound", "detail": "..."}]}`
//! - deploy-service: `{"message": "..."}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

pub fn cf_error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    let (code, title) = match status {
        StatusCode::NOT_FOUND => (10010, "CF-ResourceNotFound"),
        StatusCode::UNAUTHORIZED => (1000, "CF-InvalidAuthToken"),
        StatusCode::UNPROCESSABLE_ENTITY => (10008, "CF-UnprocessableEntity"),
        _ => (10001, "CF-ServiceUnavailable"),
    };
    (
        status,
        Json(json!({
            "errors": [{
                "code": code,
                "title": title,
                "detail": detail.into(),
            }]
        })),
    )
        .into_response()
}

pub fn deploy_service_error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}
