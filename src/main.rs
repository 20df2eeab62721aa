// ReturnBot — service entrypoint
// Env → Config, logger, shared state, axum webhook server.

use log::{error, info};
use returnbot::atoms::error::RelayResult;
use returnbot::engine::config::Config;
use returnbot::engine::state::RelayState;
use returnbot::engine::whatsapp;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("[main] fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> RelayResult<()> {
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(RelayState::new(config));

    let app = whatsapp::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("[main] returnbot listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
