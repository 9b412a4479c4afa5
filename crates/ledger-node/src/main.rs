use std::net::SocketAddr;

use clap::Parser;
use ledger_node::{AppState, Args, NodeConfig};
use tokio::signal;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let addr: SocketAddr = args.listen.parse()?;
    let config = NodeConfig::from(&args);
    let state = AppState::new(config)?;

    info!(
        public_url = %state.config.public_url,
        difficulty = state.config.difficulty,
        peers = state.config.peers.len(),
        "ledger-node listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    ledger_node::serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
