//! Cloud Foundry Mock Server
//!
//! Serves the in-memory CF v3 / UAA / deploy-service mock for local development.
//!
//! Environment Variables:
//! - PORT: Port to listen on (default: 1234)
//! - MOCK_USERNAME / MOCK_PASSWORD: Credentials accepted by the token endpoint
//! - MOCK_POLLS_UNTIL_FINISHED: Reads before a job or operation settles (default: 1)

use anyhow::Context;
use cf_mock_server::{serve, MockBehaviour, MockState};
use std::env;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cf_mock_server=info,tower_http=info".into()),
        )
        .init();

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(1234);

    let mut behaviour = MockBehaviour::default();
    if let Ok(username) = env::var("MOCK_USERNAME") {
        behaviour.username = username;
    }
    if let Ok(password) = env::var("MOCK_PASSWORD") {
        behaviour.password = password;
    }
    if let Some(polls) = env::var("MOCK_POLLS_UNTIL_FINISHED")
        .ok()
        .and_then(|p| p.parse().ok())
    {
        behaviour.polls_until_finished = polls;
    }

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!("Cloud Foundry mock server listening on 0.0.0.0:{}", port);

    serve(listener, MockState::new(behaviour)).await
}
