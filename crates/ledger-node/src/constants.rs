pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub(crate) const DEFAULT_PEER_TIMEOUT_MS: u64 = 5_000;
pub(crate) const DEFAULT_MAX_CONCURRENT_PEERS: usize = 8;
pub(crate) const MINE_ATTEMPTS: usize = 3;
