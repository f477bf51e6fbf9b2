//! Cloud Foundry Mock Server
//!
//! A lightweight Axum-based HTTP server that mocks the parts of the Cloud
//! Foundry platform the controller talks to: the CF v3 API, the UAA token
//! endpoint and the MTA deploy-service. State is kept in memory.
//!
//! Integration tests start it on an ephemeral port with [`spawn`]; the
//! `cf-mock-server` binary serves it on a fixed port for local development.

pub mod cf;
pub mod deploy_service;
pub mod errors;
pub mod store;
pub mod uaa;

pub use store::{MockBehaviour, MockState};

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use errors::cf_error_response;
use paths::routes;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Reject requests without a bearer token issued by this mock
async fn require_token(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::to_string);

    let accepted = match token {
        Some(token) => state.records.read().await.tokens.contains(&token),
        None => false,
    };
    if !accepted {
        warn!("  Unauthorized request to {}", request.uri().path());
        return cf_error_response(StatusCode::UNAUTHORIZED, "Invalid Auth Token");
    }
    next.run(request).await
}

/// Build the mock router
pub fn router(state: MockState) -> Router {
    let protected = Router::new()
        .route(routes::CF_JOB, get(cf::get_job))
        .route(
            routes::CF_ORGANIZATIONS,
            get(cf::list_organizations).post(cf::create_organization),
        )
        .route(
            routes::CF_ORGANIZATION,
            get(cf::get_organization)
                .patch(cf::update_organization)
                .delete(cf::delete_organization),
        )
        .route(routes::CF_SPACES, get(cf::list_spaces).post(cf::create_space))
        .route(
            routes::CF_SPACE,
            get(cf::get_space)
                .patch(cf::update_space)
                .delete(cf::delete_space),
        )
        .route(
            routes::CF_SPACE_SSH_FEATURE,
            get(cf::get_space_ssh).patch(cf::update_space_ssh),
        )
        .route(routes::CF_DOMAINS, post(cf::create_domain))
        .route(
            routes::CF_DOMAIN,
            get(cf::get_domain).delete(cf::delete_domain),
        )
        .route(routes::CF_ORG_QUOTAS, post(cf::create_org_quota))
        .route(
            routes::CF_ORG_QUOTA,
            get(cf::get_org_quota)
                .patch(cf::update_org_quota)
                .delete(cf::delete_org_quota),
        )
        .route(routes::CF_ORG_QUOTA_ORGANIZATIONS, post(cf::apply_org_quota))
        .route(routes::CF_ROLES, get(cf::list_roles).post(cf::create_role))
        .route(routes::CF_ROLE, axum::routing::delete(cf::delete_role))
        .route(routes::MTA_FILES, post(deploy_service::upload_file))
        .route(routes::MTA_FILES_ASYNC, post(deploy_service::upload_file_async))
        .route(routes::MTA_FILE_JOB, get(deploy_service::get_file_job))
        .route(routes::MTA_OPERATIONS, post(deploy_service::start_operation))
        .route(routes::MTA_OPERATION, get(deploy_service::get_operation))
        .route(routes::MTA, get(deploy_service::get_mta))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route(routes::ROOT, get(uaa::api_root))
        .route(routes::TOKEN, post(uaa::token))
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Serve the mock on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, state: MockState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Start the mock on `127.0.0.1:0` in a background task
///
/// Returns the bound address and a handle to the shared state so tests can
/// tune behaviour and inspect recorded requests.
pub async fn spawn(behaviour: MockBehaviour) -> anyhow::Result<(SocketAddr, MockState)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = MockState::new(behaviour);
    let served = state.clone();
    tokio::spawn(async move {
        if let Err(e) = serve(listener, served).await {
            warn!("mock server stopped: {}", e);
        }
    });
    Ok((addr, state))
}
