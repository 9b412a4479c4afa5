use std::collections::HashSet;

use crate::{LedgerError, LedgerResult};

/// Normalises a peer endpoint: an `http(s)://host[:port][/path]` URL with no
/// whitespace. A trailing `/` is dropped so `http://a/` and `http://a` collide.
pub fn normalize_peer(address: &str) -> LedgerResult<String> {
    let address = address.trim();
    let invalid = || LedgerError::InvalidPeer(address.to_string());

    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let rest = address
        .strip_prefix("http://")
        .or_else(|| address.strip_prefix("https://"))
        .ok_or_else(invalid)?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() || host.starts_with(':') {
        return Err(invalid());
    }
    Ok(address.trim_end_matches('/').to_string())
}

/// Known peer endpoints. Unordered and deduplicated.
#[derive(Clone, Debug, Default)]
pub struct PeerSet {
    peers: HashSet<String>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer. Returns `Ok(true)` if it was not known before.
    pub fn register(&mut self, address: &str) -> LedgerResult<bool> {
        let peer = normalize_peer(address)?;
        Ok(self.peers.insert(peer))
    }

    /// Merges addresses from a remote peer list, skipping malformed entries
    /// and `own_address`. Returns how many were new.
    pub fn merge<I, S>(&mut self, addresses: I, own_address: Option<&str>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let own = own_address.and_then(|a| normalize_peer(a).ok());
        addresses
            .into_iter()
            .filter_map(|a| normalize_peer(a.as_ref()).ok())
            .filter(|a| own.as_deref() != Some(a.as_str()))
            .filter(|a| self.peers.insert(a.clone()))
            .count()
    }

    pub fn contains(&self, address: &str) -> bool {
        normalize_peer(address).is_ok_and(|p| self.peers.contains(&p))
    }

    /// Owned copy for fan-out, so no lock is held while peers are contacted.
    pub fn snapshot(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_deduplicates() {
        let mut peers = PeerSet::new();
        assert_eq!(peers.register("http://127.0.0.1:8001"), Ok(true));
        assert_eq!(peers.register("http://127.0.0.1:8001/"), Ok(false));
        assert_eq!(peers.len(), 1);
        assert!(peers.contains("http://127.0.0.1:8001/"));
    }

    #[test]
    fn register_rejects_malformed() {
        let mut peers = PeerSet::new();
        for bad in ["", "   ", "127.0.0.1:8001", "ftp://x", "http://", "http://a b", "http://:80"] {
            assert!(
                matches!(peers.register(bad), Err(LedgerError::InvalidPeer(_))),
                "{bad:?} accepted"
            );
        }
        assert!(peers.is_empty());
    }

    #[test]
    fn merge_skips_self_and_garbage() {
        let mut peers = PeerSet::new();
        peers.register("http://a:1").unwrap();
        let added = peers.merge(
            ["http://a:1", "http://b:2/", "nonsense", "http://me:3"],
            Some("http://me:3"),
        );
        assert_eq!(added, 1);
        assert!(peers.contains("http://b:2"));
        assert!(!peers.contains("http://me:3"));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut peers = PeerSet::new();
        peers.register("https://node.example/").unwrap();
        let snapshot = peers.snapshot();
        peers.register("https://other.example").unwrap();
        assert_eq!(snapshot, vec!["https://node.example".to_string()]);
        assert_eq!(peers.len(), 2);
    }
}
