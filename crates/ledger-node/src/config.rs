use std::time::Duration;

use clap::Parser;
use ledger_core::{constants::POW_DEFAULT_DIFFICULTY, ValidationPolicy};

use crate::constants::{DEFAULT_LISTEN, DEFAULT_MAX_CONCURRENT_PEERS, DEFAULT_PEER_TIMEOUT_MS};

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// URL peers use to reach this node (defaults to http://<listen>)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Leading zero hex digits required of a block hash
    #[arg(long, default_value_t = POW_DEFAULT_DIFFICULTY)]
    pub difficulty: usize,

    /// Peer to know about at startup; repeatable
    #[arg(long = "peer")]
    pub peers: Vec<String>,

    /// Per-peer request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    pub peer_timeout_ms: u64,

    /// Peers contacted at once during broadcast and consensus
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_PEERS)]
    pub max_concurrent_peers: usize,

    /// Run consensus every N seconds; 0 disables the background loop
    #[arg(long, default_value_t = 0)]
    pub sync_interval_secs: u64,

    /// Search nonces on all cores
    #[arg(long)]
    pub parallel_mining: bool,

    /// Also require proof-of-work difficulty of every block in a peer's chain
    #[arg(long)]
    pub strict_validation: bool,
}

/// Runtime settings of a node, independent of how they were parsed.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub public_url: String,
    pub difficulty: usize,
    pub peers: Vec<String>,
    pub peer_timeout: Duration,
    pub max_concurrent_peers: usize,
    pub sync_interval: Option<Duration>,
    pub parallel_mining: bool,
    pub strict_validation: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            public_url: format!("http://{DEFAULT_LISTEN}"),
            difficulty: POW_DEFAULT_DIFFICULTY,
            peers: Vec::new(),
            peer_timeout: Duration::from_millis(DEFAULT_PEER_TIMEOUT_MS),
            max_concurrent_peers: DEFAULT_MAX_CONCURRENT_PEERS,
            sync_interval: None,
            parallel_mining: false,
            strict_validation: false,
        }
    }
}

impl NodeConfig {
    pub fn validation_policy(&self) -> ValidationPolicy {
        if self.strict_validation {
            ValidationPolicy::Strict {
                difficulty: self.difficulty,
            }
        } else {
            ValidationPolicy::Linkage
        }
    }
}

impl From<&Args> for NodeConfig {
    fn from(args: &Args) -> Self {
        Self {
            public_url: args
                .public_url
                .clone()
                .unwrap_or_else(|| format!("http://{}", args.listen)),
            difficulty: args.difficulty,
            peers: args.peers.clone(),
            peer_timeout: Duration::from_millis(args.peer_timeout_ms),
            max_concurrent_peers: args.max_concurrent_peers.max(1),
            sync_interval: (args.sync_interval_secs > 0)
                .then(|| Duration::from_secs(args.sync_interval_secs)),
            parallel_mining: args.parallel_mining,
            strict_validation: args.strict_validation,
        }
    }
}
