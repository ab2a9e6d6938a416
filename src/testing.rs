//! Scripted in-memory node used by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::api::{NodeApi, StatsResponse};
use crate::dashboard::BlockDetail;
use crate::error::{DashboardError, Result};
use crate::mining::MiningStatus;
use crate::transaction::SignedTransaction;
use crate::wallet::Wallet;

fn offline<T>() -> Result<T> {
    Err(DashboardError::NetworkFailure("not scripted".to_string()))
}

/// Records every call by its path and answers from scripted results.
///
/// Mining start/stop flip the scripted `is_mining` flag on success, like a node would.
pub(crate) struct ScriptedNodeApi {
    calls: Mutex<Vec<String>>,
    stats: Mutex<Result<StatsResponse>>,
    blocks: Mutex<HashMap<u64, Result<BlockDetail>>>,
    block_delays: Mutex<HashMap<u64, Duration>>,
    utxos: Mutex<Result<Vec<Value>>>,
    created_wallet: Mutex<Result<Wallet>>,
    submit_result: Mutex<Result<String>>,
    last_submission: Mutex<Option<SignedTransaction>>,
    mining: Mutex<Result<MiningStatus>>,
    start_result: Mutex<Result<()>>,
    stop_result: Mutex<Result<()>>,
    gates: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
}

impl ScriptedNodeApi {
    pub(crate) fn new() -> Self {
        ScriptedNodeApi {
            calls: Mutex::new(Vec::new()),
            stats: Mutex::new(offline()),
            blocks: Mutex::new(HashMap::new()),
            block_delays: Mutex::new(HashMap::new()),
            utxos: Mutex::new(Ok(Vec::new())),
            created_wallet: Mutex::new(offline()),
            submit_result: Mutex::new(offline()),
            last_submission: Mutex::new(None),
            mining: Mutex::new(Ok(MiningStatus::default())),
            start_result: Mutex::new(Ok(())),
            stop_result: Mutex::new(Ok(())),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn count_calls(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == path).count()
    }

    pub(crate) fn set_stats(&self, stats: Result<StatsResponse>) {
        *self.stats.lock() = stats;
    }

    pub(crate) fn set_block(&self, height: u64, block: Result<BlockDetail>) {
        self.blocks.lock().insert(height, block);
    }

    pub(crate) fn delay_block(&self, height: u64, delay: Duration) {
        self.block_delays.lock().insert(height, delay);
    }

    pub(crate) fn set_utxos(&self, utxos: Result<Vec<Value>>) {
        *self.utxos.lock() = utxos;
    }

    pub(crate) fn set_created_wallet(&self, wallet: Result<Wallet>) {
        *self.created_wallet.lock() = wallet;
    }

    pub(crate) fn set_submit_result(&self, result: Result<String>) {
        *self.submit_result.lock() = result;
    }

    pub(crate) fn last_submission(&self) -> Option<SignedTransaction> {
        self.last_submission.lock().clone()
    }

    pub(crate) fn set_mining(&self, status: Result<MiningStatus>) {
        *self.mining.lock() = status;
    }

    pub(crate) fn set_start_result(&self, result: Result<()>) {
        *self.start_result.lock() = result;
    }

    pub(crate) fn set_stop_result(&self, result: Result<()>) {
        *self.stop_result.lock() = result;
    }

    /// Blocks calls to `path` until permits are added to the returned semaphore.
    pub(crate) fn hold(&self, path: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().insert(path, gate.clone());
        gate
    }

    /// Stops holding new calls to `path`. Calls already waiting stay blocked.
    pub(crate) fn release(&self, path: &'static str) {
        self.gates.lock().remove(path);
    }

    async fn enter(&self, path: String, gate_key: &'static str) {
        self.calls.lock().push(path);
        let gate = self.gates.lock().get(gate_key).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn set_is_mining(&self, is_mining: bool) {
        let mut mining = self.mining.lock();
        if let Ok(status) = mining.as_mut() {
            status.is_mining = is_mining;
        }
    }
}

#[async_trait]
impl NodeApi for ScriptedNodeApi {
    async fn blockchain_stats(&self) -> Result<StatsResponse> {
        self.enter("blockchain/stats".to_string(), "blockchain/stats").await;
        self.stats.lock().clone()
    }

    async fn block_by_height(&self, height: u64) -> Result<BlockDetail> {
        self.enter(format!("blockchain/block/by-height/{}", height), "blockchain/block")
            .await;
        let delay = self.block_delays.lock().get(&height).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.blocks
            .lock()
            .get(&height)
            .cloned()
            .unwrap_or_else(|| Err(DashboardError::http_status(404, "Block not found")))
    }

    async fn block_by_hash(&self, hash: &str) -> Result<BlockDetail> {
        self.enter(format!("blockchain/block/by-hash/{}", hash), "blockchain/block")
            .await;
        self.blocks
            .lock()
            .values()
            .find(|b| matches!(b, Ok(block) if block.hash == hash))
            .cloned()
            .unwrap_or_else(|| Err(DashboardError::http_status(404, "Block not found")))
    }

    async fn utxos(&self, address: &str) -> Result<Vec<Value>> {
        self.enter(format!("blockchain/utxos/{}", address), "blockchain/utxos")
            .await;
        self.utxos.lock().clone()
    }

    async fn create_wallet(&self) -> Result<Wallet> {
        self.enter("wallet/create".to_string(), "wallet/create").await;
        self.created_wallet.lock().clone()
    }

    async fn submit_transaction(&self, submission: &SignedTransaction) -> Result<String> {
        self.enter("wallet/send".to_string(), "wallet/send").await;
        *self.last_submission.lock() = Some(submission.clone());
        self.submit_result.lock().clone()
    }

    async fn mining_status(&self) -> Result<MiningStatus> {
        self.enter("mining/status".to_string(), "mining/status").await;
        self.mining.lock().clone()
    }

    async fn start_mining(&self, miner_address: &str) -> Result<()> {
        self.enter(format!("mining/start/{}", miner_address), "mining/start")
            .await;
        let result = self.start_result.lock().clone();
        if result.is_ok() {
            self.set_is_mining(true);
        }
        result
    }

    async fn stop_mining(&self) -> Result<()> {
        self.enter("mining/stop".to_string(), "mining/stop").await;
        let result = self.stop_result.lock().clone();
        if result.is_ok() {
            self.set_is_mining(false);
        }
        result
    }
}
