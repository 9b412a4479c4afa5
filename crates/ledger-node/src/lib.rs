//! HTTP node around `ledger-core`: transport, peer client, mining worker and
//! the consensus/broadcast drivers.

pub mod config;
mod constants;
pub mod error;
pub mod mining;
pub mod peers;
pub mod routes;
pub mod state;
pub mod sync;

pub use config::{Args, NodeConfig};
pub use routes::router;
pub use state::{AppState, SharedState};

/// Serves `state` on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: SharedState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Some(every) = state.config.sync_interval {
        sync::spawn_sync_loop(state.clone(), every);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
