//! In-process mock of the node's HTTP API, served by axum on a random port

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Default)]
pub struct MockNode {
    pub height: Mutex<u64>,
    pub utxo_count: Mutex<u64>,
    /// Heights whose detail endpoint answers 500.
    pub broken_blocks: Mutex<Vec<u64>>,
    pub utxos: Mutex<HashMap<String, usize>>,
    pub wallet: Mutex<Option<Value>>,
    pub sends: Mutex<Vec<Value>>,
    pub reject_sends: Mutex<Option<String>>,
    pub is_mining: Mutex<bool>,
    pub miner_addresses: Mutex<Vec<String>>,
    pub hits: Mutex<HashMap<String, usize>>,
}

impl MockNode {
    fn hit(&self, route: &str) {
        *self.hits.lock().entry(route.to_string()).or_default() += 1;
    }

    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().get(route).copied().unwrap_or(0)
    }

    pub fn block_hash(height: u64) -> String {
        format!("{:064x}", height + 0xabc000)
    }

    fn block_json(&self, height: u64) -> Value {
        let prev: Vec<u8> = hex::decode(Self::block_hash(height.saturating_sub(1)))
            .unwrap_or_default();
        let transactions: Vec<Value> = (0..height % 3)
            .map(|i| {
                json!({
                    "hash": format!("{:064x}", height * 100 + i),
                    "timestamp": 1_700_000_000 + height as i64 * 60 + i as i64,
                })
            })
            .collect();
        json!({
            "header": {
                "height": height,
                "hash": Self::block_hash(height),
                // Older nodes serialize hashes as byte arrays.
                "previous_hash": prev,
                "timestamp": 1_700_000_000 + height as i64 * 60,
                "difficulty": 2,
                "nonce": height * 17,
            },
            "transactions": transactions,
        })
    }
}

type Shared = Arc<MockNode>;

async fn stats(State(node): State<Shared>) -> Json<Value> {
    node.hit("stats");
    let height = *node.height.lock();
    let recent: Vec<Value> = (0..=height)
        .rev()
        .take(10)
        .map(|h| json!({"height": h, "hash": MockNode::block_hash(h)}))
        .collect();
    Json(json!({
        "height": height,
        "utxo_count": *node.utxo_count.lock(),
        "difficulty": 2,
        "mempool_size": 0,
        "total_blocks": height + 1,
        "recent_blocks": recent,
    }))
}

async fn block_by_height(State(node): State<Shared>, Path(height): Path<u64>) -> Response {
    node.hit("by-height");
    if height > *node.height.lock() {
        return (StatusCode::NOT_FOUND, "Block not found").into_response();
    }
    if node.broken_blocks.lock().contains(&height) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "disk error").into_response();
    }
    Json(node.block_json(height)).into_response()
}

async fn block_by_hash(State(node): State<Shared>, Path(hash): Path<String>) -> Response {
    node.hit("by-hash");
    let height = *node.height.lock();
    match (0..=height).find(|&h| MockNode::block_hash(h) == hash) {
        Some(h) => Json(node.block_json(h)).into_response(),
        None => (StatusCode::NOT_FOUND, "Block not found").into_response(),
    }
}

async fn utxos(State(node): State<Shared>, Path(address): Path<String>) -> Json<Value> {
    node.hit("utxos");
    let count = node.utxos.lock().get(&address).copied().unwrap_or(0);
    let entries: Vec<Value> = (0..count)
        .map(|i| json!({"owner": address, "area": 100.0, "index": i}))
        .collect();
    Json(Value::Array(entries))
}

async fn create_wallet(State(node): State<Shared>) -> Response {
    node.hit("create");
    match node.wallet.lock().clone() {
        Some(wallet) => Json(wallet).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "wallet service down").into_response(),
    }
}

async fn send(State(node): State<Shared>, Json(body): Json<Value>) -> Response {
    node.hit("send");
    if let Some(reason) = node.reject_sends.lock().clone() {
        return (StatusCode::BAD_REQUEST, reason).into_response();
    }
    node.sends.lock().push(body);
    "\"tx-0001\"".into_response()
}

async fn mining_status(State(node): State<Shared>) -> Json<Value> {
    node.hit("mining-status");
    let is_mining = *node.is_mining.lock();
    Json(json!({
        "is_mining": is_mining,
        "blocks_mined": 4,
        "hashrate": if is_mining { 1234.5 } else { 0.0 },
    }))
}

async fn start_mining(State(node): State<Shared>, Json(body): Json<Value>) -> Response {
    node.hit("mining-start");
    let mut is_mining = node.is_mining.lock();
    if *is_mining {
        return (StatusCode::CONFLICT, "Mining already running").into_response();
    }
    let address = body["miner_address"].as_str().unwrap_or_default().to_string();
    node.miner_addresses.lock().push(address);
    *is_mining = true;
    StatusCode::OK.into_response()
}

async fn stop_mining(State(node): State<Shared>) -> Response {
    node.hit("mining-stop");
    *node.is_mining.lock() = false;
    StatusCode::OK.into_response()
}

pub fn router(node: Shared) -> Router {
    let api = Router::new()
        .route("/blockchain/stats", get(stats))
        .route("/blockchain/block/by-height/:height", get(block_by_height))
        .route("/blockchain/block/by-hash/:hash", get(block_by_hash))
        .route("/blockchain/utxos/:address", get(utxos))
        .route("/wallet/create", post(create_wallet))
        .route("/wallet/send", post(send))
        .route("/mining/status", get(mining_status))
        .route("/mining/start", post(start_mining))
        .route("/mining/stop", post(stop_mining))
        .with_state(node);
    Router::new().nest("/api", api)
}

/// Serves a mock node and returns it with its API base, e.g. `http://127.0.0.1:PORT/api`.
pub async fn spawn_node() -> (Shared, String) {
    let node = Arc::new(MockNode::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(node.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (node, format!("http://{}/api", addr))
}

/// A base URL nothing listens on.
pub async fn dead_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}
