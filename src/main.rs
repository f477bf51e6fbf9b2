//! # Cloud Foundry Provider Controller
//!
//! Controller process: initializes the runtime and runs one watch loop per
//! managed kind until SIGTERM or SIGINT.

use anyhow::Result;
use cf_provider_controller::runtime::initialization::initialize;
use cf_provider_controller::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.client,
        init_result.reconciler,
        init_result.server_state,
    )
    .await
}
