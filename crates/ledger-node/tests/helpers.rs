use ledger_core::ChainDump;
use ledger_node::{AppState, NodeConfig, SharedState};
use reqwest::{Client, StatusCode};
use serde_json::json;

pub struct TestNode {
    pub url: String,
    pub state: SharedState,
    pub http: Client,
}

pub async fn spawn_node(difficulty: usize) -> TestNode {
    spawn_node_with(NodeConfig {
        difficulty,
        ..NodeConfig::default()
    })
    .await
}

pub async fn spawn_node_with(mut config: NodeConfig) -> TestNode {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    config.public_url = format!("http://{addr}");
    let state = AppState::new(config).expect("node state");

    tokio::spawn(ledger_node::serve(
        listener,
        state.clone(),
        std::future::pending::<()>(),
    ));

    TestNode {
        url: format!("http://{addr}"),
        state,
        http: Client::new(),
    }
}

impl TestNode {
    pub async fn submit(&self, author: &str, content: &str) -> StatusCode {
        self.http
            .post(format!("{}/new_transaction", self.url))
            .json(&json!({ "author": author, "content": content }))
            .send()
            .await
            .expect("submit")
            .status()
    }

    pub async fn mine(&self) -> String {
        self.http
            .get(format!("{}/mine", self.url))
            .send()
            .await
            .expect("mine")
            .text()
            .await
            .expect("mine body")
    }

    pub async fn chain(&self) -> ChainDump {
        self.http
            .get(format!("{}/chain", self.url))
            .send()
            .await
            .expect("chain")
            .json()
            .await
            .expect("chain body")
    }

    pub async fn consensus(&self) -> String {
        self.http
            .get(format!("{}/consensus", self.url))
            .send()
            .await
            .expect("consensus")
            .text()
            .await
            .expect("consensus body")
    }

    /// Grows the chain to `len` blocks, one post per block.
    pub async fn grow_to(&self, len: usize) {
        while self.chain().await.length < len {
            assert_eq!(self.submit("bob", "filler").await, StatusCode::CREATED);
            assert!(self.mine().await.ends_with("mined"));
        }
    }
}
