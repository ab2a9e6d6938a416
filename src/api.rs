//! HTTP boundary to a TrinityChain node
//!
//! [`NodeApi`] is the seam every component talks through. [`HttpNodeApi`] is
//! the production implementation: JSON over HTTP against the node's `/api`
//! routes. Any non-2xx answer is a `NetworkFailure` carrying the response body.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::dashboard::{BlockDetail, TransactionSummary};
use crate::error::{DashboardError, Result};
use crate::mining::MiningStatus;
use crate::transaction::SignedTransaction;
use crate::wallet::Wallet;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the dashboard needs from a node.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// `GET /blockchain/stats`
    async fn blockchain_stats(&self) -> Result<StatsResponse>;
    /// `GET /blockchain/block/by-height/{h}`
    async fn block_by_height(&self, height: u64) -> Result<BlockDetail>;
    /// `GET /blockchain/block/by-hash/{hash}`
    async fn block_by_hash(&self, hash: &str) -> Result<BlockDetail>;
    /// `GET /blockchain/utxos/{address}`
    async fn utxos(&self, address: &str) -> Result<Vec<Value>>;
    /// `POST /wallet/create`
    async fn create_wallet(&self) -> Result<Wallet>;
    /// `POST /wallet/send`, returns the transaction hash the node reports.
    async fn submit_transaction(&self, submission: &SignedTransaction) -> Result<String>;
    /// `GET /mining/status`
    async fn mining_status(&self) -> Result<MiningStatus>;
    /// `POST /mining/start`
    async fn start_mining(&self, miner_address: &str) -> Result<()>;
    /// `POST /mining/stop`
    async fn stop_mining(&self) -> Result<()>;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub utxo_count: u64,
    #[serde(default = "default_difficulty")]
    pub difficulty: u64,
    #[serde(default)]
    pub recent_blocks: Vec<RecentBlock>,
}

/// Nodes that omit difficulty are running the genesis default.
fn default_difficulty() -> u64 {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecentBlock {
    pub height: u64,
    #[serde(default, deserialize_with = "hex_field")]
    pub hash: String,
}

#[derive(Serialize)]
struct StartMiningRequest<'a> {
    miner_address: &'a str,
}

/// Hashes arrive either as hex strings or as raw `[u8; 32]` arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrBytes {
    Hex(String),
    Bytes(Vec<u8>),
}

impl HexOrBytes {
    fn into_hex(self) -> String {
        match self {
            HexOrBytes::Hex(s) => s,
            HexOrBytes::Bytes(b) => hex::encode(b),
        }
    }
}

fn hex_field<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<HexOrBytes>::deserialize(deserializer)?;
    Ok(value.map(HexOrBytes::into_hex).unwrap_or_default())
}

#[derive(Deserialize)]
struct BlockHeaderWire {
    height: u64,
    #[serde(default, deserialize_with = "hex_field")]
    hash: String,
    #[serde(default, deserialize_with = "hex_field")]
    previous_hash: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    difficulty: u64,
    #[serde(default)]
    nonce: u64,
}

#[derive(Deserialize)]
struct TransactionWire {
    #[serde(default, deserialize_with = "hex_field")]
    hash: String,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Deserialize)]
struct BlockWire {
    header: BlockHeaderWire,
    #[serde(default, deserialize_with = "hex_field")]
    hash: String,
    #[serde(default)]
    transactions: Vec<TransactionWire>,
}

impl From<BlockWire> for BlockDetail {
    fn from(wire: BlockWire) -> Self {
        let hash = if wire.header.hash.is_empty() {
            wire.hash
        } else {
            wire.header.hash
        };
        BlockDetail {
            height: wire.header.height,
            hash,
            previous_hash: wire.header.previous_hash,
            timestamp: wire.header.timestamp,
            difficulty: wire.header.difficulty,
            nonce: wire.header.nonce,
            transactions: wire
                .transactions
                .into_iter()
                .map(|tx| TransactionSummary {
                    hash: tx.hash,
                    timestamp: tx.timestamp,
                })
                .collect(),
        }
    }
}

/// Decodes a node block object (`{"header": {...}, "transactions": [...]}`).
pub fn parse_block(body: &str) -> Result<BlockDetail> {
    let wire: BlockWire = serde_json::from_str(body)?;
    Ok(wire.into())
}

/// The send endpoint answers with bare text, sometimes JSON-quoted.
fn parse_transaction_hash(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<String>(trimmed) {
        Ok(unquoted) => unquoted,
        Err(_) => trimmed.to_string(),
    }
}

// ============================================================================
// HTTP implementation
// ============================================================================

#[derive(Clone)]
pub struct HttpNodeApi {
    http: Client,
    base: Url,
}

impl std::fmt::Debug for HttpNodeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNodeApi")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpNodeApi {
    /// Builds a client for an absolute API base such as `http://127.0.0.1:3000/api`.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(DashboardError::Config(format!(
                "API base {} cannot carry a path",
                base
            )));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the API base.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| DashboardError::Config(format!("API base {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, label: &'static str) -> Result<String> {
        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = label, error = %e, "node.request.failed");
                return Err(e.into());
            }
        };
        let status = response.status();
        let body = response.text().await?;

        debug!(
            endpoint = label,
            status = %status.as_u16(),
            duration_ms = %start.elapsed().as_millis(),
            "node.request"
        );

        if !status.is_success() {
            return Err(DashboardError::http_status(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], label: &'static str) -> Result<T> {
        let url = self.url(segments)?;
        let body = self.send(self.http.get(url), label).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl NodeApi for HttpNodeApi {
    async fn blockchain_stats(&self) -> Result<StatsResponse> {
        self.get_json(&["blockchain", "stats"], "blockchain.stats").await
    }

    async fn block_by_height(&self, height: u64) -> Result<BlockDetail> {
        let url = self.url(&["blockchain", "block", "by-height", &height.to_string()])?;
        let body = self.send(self.http.get(url), "blockchain.block.by_height").await?;
        parse_block(&body)
    }

    async fn block_by_hash(&self, hash: &str) -> Result<BlockDetail> {
        let url = self.url(&["blockchain", "block", "by-hash", hash])?;
        let body = self.send(self.http.get(url), "blockchain.block.by_hash").await?;
        let mut block = parse_block(&body)?;
        if block.hash.is_empty() {
            block.hash = hash.to_string();
        }
        Ok(block)
    }

    async fn utxos(&self, address: &str) -> Result<Vec<Value>> {
        self.get_json(&["blockchain", "utxos", address], "blockchain.utxos").await
    }

    async fn create_wallet(&self) -> Result<Wallet> {
        let url = self.url(&["wallet", "create"])?;
        let body = self.send(self.http.post(url), "wallet.create").await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn submit_transaction(&self, submission: &SignedTransaction) -> Result<String> {
        let url = self.url(&["wallet", "send"])?;
        let body = self
            .send(self.http.post(url).json(submission), "wallet.send")
            .await?;
        Ok(parse_transaction_hash(&body))
    }

    async fn mining_status(&self) -> Result<MiningStatus> {
        self.get_json(&["mining", "status"], "mining.status").await
    }

    async fn start_mining(&self, miner_address: &str) -> Result<()> {
        let url = self.url(&["mining", "start"])?;
        self.send(
            self.http.post(url).json(&StartMiningRequest { miner_address }),
            "mining.start",
        )
        .await?;
        Ok(())
    }

    async fn stop_mining(&self) -> Result<()> {
        let url = self.url(&["mining", "stop"])?;
        self.send(
            self.http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json"),
            "mining.stop",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_with_hex_hashes() {
        let body = r#"{
            "header": {
                "height": 7,
                "hash": "aa11",
                "previous_hash": "bb22",
                "timestamp": 1700000000,
                "difficulty": 3,
                "nonce": 42
            },
            "transactions": [{"hash": "cc33", "timestamp": 1700000001}]
        }"#;
        let block = parse_block(body).unwrap();
        assert_eq!(block.height, 7);
        assert_eq!(block.hash, "aa11");
        assert_eq!(block.previous_hash, "bb22");
        assert_eq!(block.nonce, 42);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].hash, "cc33");
    }

    #[test]
    fn test_parse_block_with_byte_array_hashes() {
        let body = r#"{
            "header": {"height": 0, "previous_hash": [0, 1, 255], "timestamp": 5, "difficulty": 1, "nonce": 0},
            "hash": "ffee",
            "transactions": [{"Coinbase": {"nonce": 0}}]
        }"#;
        let block = parse_block(body).unwrap();
        assert_eq!(block.previous_hash, "0001ff");
        assert_eq!(block.hash, "ffee");
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].hash.is_empty());
    }

    #[test]
    fn test_parse_block_rejects_missing_header() {
        let err = parse_block(r#"{"transactions": []}"#).unwrap_err();
        assert!(matches!(err, DashboardError::MalformedResponse(_)));
    }

    #[test]
    fn test_stats_defaults() {
        let stats: StatsResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(stats.height, 0);
        assert_eq!(stats.difficulty, 2);
        assert!(stats.recent_blocks.is_empty());
    }

    #[test]
    fn test_transaction_hash_text() {
        assert_eq!(parse_transaction_hash("abc123\n"), "abc123");
        assert_eq!(parse_transaction_hash("\"abc123\""), "abc123");
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let api = HttpNodeApi::new(
            Url::parse("http://127.0.0.1:3000/api/").unwrap(),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .unwrap();
        let url = api.url(&["blockchain", "utxos", "a b/c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3000/api/blockchain/utxos/a%20b%2Fc"
        );
    }
}
