//! Talking to peers: consensus, block broadcast and bootstrap registration.

use std::time::Duration;

use ledger_core::{peers::normalize_peer, select_longest, Block, ChainCandidate, ChainDump};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    peers::{fan_out, FanOutReport},
    state::{AppState, SharedState},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Replaced { peer: String, length: usize },
    Authoritative,
}

impl Resolution {
    pub fn message(&self) -> &'static str {
        match self {
            Resolution::Replaced { .. } => "Chain replaced",
            Resolution::Authoritative => "Chain is authoritative",
        }
    }
}

/// One longest-chain pass over every known peer.
///
/// Peers are polled without holding any lock; the winning chain is then
/// re-checked by the ledger under its write lock, so a chain that grew
/// meanwhile is never shortened.
pub async fn resolve(state: &AppState) -> Resolution {
    let peers = state.peers.read().await.snapshot();
    let (local_len, policy) = {
        let ledger = state.ledger.read().await;
        (ledger.height(), ledger.policy())
    };

    let client = state.client.clone();
    let report = fan_out(peers, state.config.max_concurrent_peers, move |peer| {
        let client = client.clone();
        async move { client.fetch_chain(&peer).await }
    })
    .await;

    let candidates: Vec<ChainCandidate> = report
        .successes
        .into_iter()
        .map(|(peer, dump)| ChainCandidate { peer, dump })
        .collect();
    let best = match tokio::task::spawn_blocking(move || {
        select_longest(local_len, candidates, policy)
    })
    .await
    {
        Ok(best) => best,
        Err(err) => {
            warn!(%err, "chain selection task failed");
            None
        }
    };

    let Some(best) = best else {
        return Resolution::Authoritative;
    };

    let length = best.dump.chain.len();
    let mut ledger = state.ledger.write().await;
    match ledger.replace_chain(best.dump.chain) {
        Ok(()) => {
            info!(peer = %best.peer, length, "adopted longer chain");
            Resolution::Replaced {
                peer: best.peer,
                length,
            }
        }
        Err(err) => {
            info!(peer = %best.peer, %err, "peer chain no longer wins");
            Resolution::Authoritative
        }
    }
}

/// Sends a sealed block to every known peer. Outcomes never touch local state.
pub async fn announce(state: &AppState, block: &Block) -> FanOutReport<()> {
    let peers = state.peers.read().await.snapshot();
    let client = state.client.clone();
    let block = block.clone();
    let report = fan_out(peers, state.config.max_concurrent_peers, move |peer| {
        let client = client.clone();
        let block = block.clone();
        async move { client.announce_block(&peer, &block).await }
    })
    .await;

    if report.attempted() > 0 {
        info!(
            delivered = report.successes.len(),
            failed = report.failures.len(),
            "block announced"
        );
    }
    report
}

/// Registers this node with `existing` and adopts its chain and peers.
///
/// The remote chain is taken as-is: the bootstrap node is trusted. On any
/// failure local state is left unchanged.
pub async fn bootstrap_from(state: &AppState, existing: &str) -> Result<ChainDump, ApiError> {
    let existing = normalize_peer(existing)?;
    let own_url = &state.config.public_url;

    let dump = state.client.register_with(&existing, own_url).await?;

    state.ledger.write().await.bootstrap(dump.chain.clone())?;
    let mut peers = state.peers.write().await;
    peers.register(&existing)?;
    let added = peers.merge(&dump.peers, Some(own_url.as_str()));
    info!(%existing, length = dump.chain.len(), new_peers = added, "bootstrapped from existing node");
    Ok(dump)
}

/// Periodic consensus. The first pass runs one full `every` after start.
pub fn spawn_sync_loop(state: SharedState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let outcome = resolve(&state).await;
            if let Resolution::Replaced { peer, length } = outcome {
                info!(%peer, length, "background sync replaced chain");
            }
        }
    })
}
