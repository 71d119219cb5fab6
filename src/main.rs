//! Cave Explorer Game Server
//!
//! Runs the WebSocket server until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cave_explorer::{
    network::{GameServer, ServerConfig},
    GameConfig, RNG_PROTOCOL, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let game = GameConfig::default();

    info!("Cave Explorer Server v{}", VERSION);
    info!("RNG protocol: {}", RNG_PROTOCOL);
    info!(
        "Turns per game: {}, insurance rate: {:.2}",
        game.max_turns, game.insurance_rate
    );
    if config.dev_mode {
        info!("Dev mode enabled: trap flags are visible to clients");
    }

    let server = Arc::new(GameServer::new(config));
    let runner = server.clone();
    let mut handle = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        result = &mut handle => {
            result.context("server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Ctrl-C received, shutting down");
            server.shutdown();
            handle.await.context("server task panicked")??;
        }
    }

    Ok(())
}
