use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, ChainDump, LedgerError, Transaction};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    error::ApiError,
    mining::{self, MineOutcome},
    state::SharedState,
    sync,
};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/new_transaction", post(new_transaction))
        .route("/chain", get(chain))
        .route("/pending_tx", get(pending_tx))
        .route("/mine", get(mine))
        .route("/register_node", post(register_node))
        .route("/register_with_existing_node", post(register_with_existing_node))
        .route("/add_block", post(add_block))
        .route("/consensus", get(consensus))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Missing fields decode as empty so they are refused by the ledger like empty ones.
#[derive(Deserialize)]
struct NewTransaction {
    #[serde(default)]
    author: String,
    #[serde(default)]
    content: String,
}

async fn new_transaction(
    State(state): State<SharedState>,
    body: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(body) = body.map_err(ApiError::MalformedTransaction)?;
    let tx = state
        .ledger
        .write()
        .await
        .submit_transaction(body.author, body.content)?;
    info!(author = %tx.author, "transaction pooled");
    Ok((StatusCode::CREATED, "Success"))
}

async fn dump(state: &SharedState) -> ChainDump {
    let chain = state.ledger.read().await.chain().to_vec();
    let peers = state.peers.read().await.snapshot();
    ChainDump::new(chain, peers)
}

async fn chain(State(state): State<SharedState>) -> Json<ChainDump> {
    Json(dump(&state).await)
}

async fn pending_tx(State(state): State<SharedState>) -> Json<Vec<Transaction>> {
    Json(state.ledger.read().await.pending().to_vec())
}

async fn mine(State(state): State<SharedState>) -> Result<String, ApiError> {
    match mining::mine(&state).await? {
        MineOutcome::NothingToMine => Ok("No transactions to mine".to_string()),
        MineOutcome::Mined(block) => {
            sync::announce(&state, &block).await;
            Ok(format!("Block #{} mined", block.index))
        }
    }
}

#[derive(Deserialize)]
struct RegisterNode {
    #[serde(default)]
    node: String,
}

async fn register_node(
    State(state): State<SharedState>,
    body: Result<Json<RegisterNode>, JsonRejection>,
) -> Result<Json<ChainDump>, ApiError> {
    let Json(body) = body.map_err(ApiError::MalformedBody)?;
    if state.peers.write().await.register(&body.node)? {
        info!(peer = %body.node, "peer registered");
    }
    Ok(Json(dump(&state).await))
}

#[derive(Deserialize)]
struct RegisterWithExisting {
    #[serde(default)]
    node_address: String,
}

async fn register_with_existing_node(
    State(state): State<SharedState>,
    body: Result<Json<RegisterWithExisting>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(body) = body.map_err(ApiError::MalformedBody)?;
    if body.node_address.is_empty() {
        return Err(LedgerError::InvalidPeer(body.node_address).into());
    }
    sync::bootstrap_from(&state, &body.node_address).await?;
    Ok("Registration successful")
}

async fn add_block(
    State(state): State<SharedState>,
    block: Result<Json<Block>, JsonRejection>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let Json(block) = block.map_err(ApiError::MalformedBody)?;
    let proof = block.hash.clone();
    state.ledger.write().await.add_block(block, &proof)?;
    Ok((StatusCode::CREATED, "Block added"))
}

async fn consensus(State(state): State<SharedState>) -> &'static str {
    sync::resolve(&state).await.message()
}
