//! Outbound calls to other nodes.
//!
//! Every call is bounded by the configured timeout, and batches of calls go
//! through [`fan_out`], which caps how many peers are contacted at once and
//! collects per-peer outcomes instead of stopping at the first failure.

use std::{future::Future, sync::Arc, time::Duration};

use ledger_core::{Block, ChainDump};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request to {peer} failed: {source}")]
    Transport {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{peer} did not answer within {after:?}")]
    Timeout { peer: String, after: Duration },

    #[error("{peer} answered {status}: {body}")]
    Status {
        peer: String,
        status: StatusCode,
        body: String,
    },

    #[error("{peer} sent a malformed response: {reason}")]
    Malformed { peer: String, reason: String },
}

#[derive(Serialize)]
struct RegisterNodeRequest<'a> {
    node: &'a str,
}

#[derive(Clone, Debug)]
pub struct PeerClient {
    http: Client,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }

    fn endpoint(peer: &str, path: &str) -> String {
        format!(
            "{}/{}",
            peer.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET {peer}/chain`
    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainDump, PeerError> {
        let request = self.http.get(Self::endpoint(peer, "/chain"));
        self.json(peer, request).await
    }

    /// `POST {peer}/add_block`. A rejection by the peer is reported as `Status`.
    pub async fn announce_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        let request = self.http.post(Self::endpoint(peer, "/add_block")).json(block);
        self.send(peer, request).await.map(|_| ())
    }

    /// `POST {existing}/register_node` announcing `own_url`; answers with the remote's dump.
    pub async fn register_with(&self, existing: &str, own_url: &str) -> Result<ChainDump, PeerError> {
        let request = self
            .http
            .post(Self::endpoint(existing, "/register_node"))
            .json(&RegisterNodeRequest { node: own_url });
        self.json(existing, request).await
    }

    async fn send(
        &self,
        peer: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PeerError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| PeerError::Timeout {
                peer: peer.to_string(),
                after: self.timeout,
            })?
            .map_err(|source| transport_error(peer, source, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PeerError::Status {
                peer: peer.to_string(),
                status,
                body,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        peer: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PeerError> {
        let response = self.send(peer, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| transport_error(peer, source, self.timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| PeerError::Malformed {
            peer: peer.to_string(),
            reason: e.to_string(),
        })
    }
}

fn transport_error(peer: &str, source: reqwest::Error, after: Duration) -> PeerError {
    if source.is_timeout() {
        PeerError::Timeout {
            peer: peer.to_string(),
            after,
        }
    } else {
        PeerError::Transport {
            peer: peer.to_string(),
            source,
        }
    }
}

/// Outcome of one call against a batch of peers.
#[derive(Debug)]
pub struct FanOutReport<T> {
    pub successes: Vec<(String, T)>,
    pub failures: Vec<(String, PeerError)>,
}

impl<T> Default for FanOutReport<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> FanOutReport<T> {
    pub fn attempted(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// Runs `call` once per peer with at most `limit` calls in flight.
///
/// Results arrive in completion order. A failing or panicking call only
/// affects its own entry.
pub async fn fan_out<T, F, Fut>(peers: Vec<String>, limit: usize, call: F) -> FanOutReport<T>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, PeerError>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();
    for peer in peers {
        let permits = permits.clone();
        let pending = call(peer.clone());
        tasks.spawn(async move {
            // the semaphore is never closed, so acquiring only waits
            let _permit = permits.acquire_owned().await;
            (peer, pending.await)
        });
    }

    let mut report = FanOutReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((peer, Ok(value))) => {
                debug!(%peer, "peer call succeeded");
                report.successes.push((peer, value));
            }
            Ok((peer, Err(err))) => {
                warn!(%peer, %err, "peer call failed");
                report.failures.push((peer, err));
            }
            Err(err) => warn!(%err, "peer task aborted"),
        }
    }
    report
}
