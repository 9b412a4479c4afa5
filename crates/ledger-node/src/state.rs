//! Shared node state handed to request handlers and background tasks.

use std::sync::Arc;

use anyhow::Context;
use ledger_core::{Ledger, PeerSet};
use tokio::sync::{Mutex, RwLock};

use crate::{config::NodeConfig, peers::PeerClient};

/// Everything a node owns. Wrapped in [`Arc`] as [`SharedState`].
///
/// `ledger` is the single critical section for chain and pool: block
/// acceptance, chain replacement and mining commits all take its write lock.
/// `mining` serialises mining jobs so at most one proof-of-work search runs.
pub struct AppState {
    pub ledger: RwLock<Ledger>,
    pub peers: RwLock<PeerSet>,
    pub client: PeerClient,
    pub config: NodeConfig,
    pub(crate) mining: Mutex<()>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: NodeConfig) -> anyhow::Result<SharedState> {
        let ledger = Ledger::new(config.difficulty).with_policy(config.validation_policy());

        let mut peers = PeerSet::new();
        for peer in &config.peers {
            peers
                .register(peer)
                .with_context(|| format!("initial peer {peer:?}"))?;
        }

        let client = PeerClient::new(config.peer_timeout).context("building HTTP client")?;

        Ok(Arc::new(Self {
            ledger: RwLock::new(ledger),
            peers: RwLock::new(peers),
            client,
            config,
            mining: Mutex::new(()),
        }))
    }
}
