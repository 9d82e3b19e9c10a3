use gridx_coordinator::prelude::*;
use gridx_coordinator::services::{dispatcher, watchdog};
use gridx_infra_store::StoreClient;
use std::net::SocketAddr;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    gridx_shared_telemetry::init_tracing("gridx-coordinator");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        if let Err(e) = run().await {
            error!("bootstrap failed: {e:#}");
            std::process::exit(1);
        }
    });

    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env();
    info!(http_port = settings.http_port, db_path = %settings.db_path, "starting coordinator");

    let store = StoreClient::connect(&settings.db_path, settings.db_auth_token.clone()).await?;
    let state = AppState::new(store, settings.clone());

    let restored = state.restore_queue_from_store().await?;
    info!(restored, "rebuilt dispatch queue from durable store");

    dispatcher::spawn(state.clone());
    watchdog::spawn(state.clone());
    state.request_dispatch();

    let router = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "coordinator listening");

    axum::serve(listener, router).await?;
    Ok(())
}
