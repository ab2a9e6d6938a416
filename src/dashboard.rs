//! Dashboard fetch/render pipeline
//!
//! A refresh is one stats fetch followed by concurrent detail fetches for the
//! most recent blocks. The two levels fail differently: if the stats fetch
//! fails the whole panel goes offline, while a failed block detail only drops
//! that block from the list.

use crate::api::{NodeApi, RecentBlock};
use crate::error::Result;
use crate::format::{format_hash, format_time};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DASHBOARD_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound on block detail fetches per refresh.
pub const MAX_RECENT_BLOCKS: usize = 5;

pub const OFFLINE: &str = "Offline";
pub const OFFLINE_MESSAGE: &str = "API server offline.";
pub const NO_BLOCKS_MESSAGE: &str = "No blocks yet.";
pub const BLOCK_NOT_FOUND: &str = "Block not found.";
pub const BLOCK_DETAILS_UNAVAILABLE: &str = "Unable to fetch block details.";
pub const NO_TRANSACTIONS: &str = "No transactions in this block.";

/// Area credited per UTXO triangle when showing total area.
const AREA_PER_UTXO: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub hash: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetail {
    pub height: u64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: i64,
    pub difficulty: u64,
    pub nonce: u64,
    pub transactions: Vec<TransactionSummary>,
}

/// A recent block whose details were fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBlock {
    pub summary: RecentBlock,
    pub detail: BlockDetail,
}

/// One complete fetch cycle. Never merged with an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub height: u64,
    pub utxo_count: u64,
    pub difficulty: u64,
    /// Most recent first, as the node listed them.
    pub recent_blocks: Vec<RecentBlock>,
    /// Successfully fetched details, in `recent_blocks` order.
    pub blocks: Vec<LoadedBlock>,
}

/// Fetches stats, then the details of the top `limit` blocks (at most
/// [`MAX_RECENT_BLOCKS`]) concurrently.
pub async fn refresh(api: &dyn NodeApi, limit: usize) -> Result<DashboardSnapshot> {
    let stats = api.blockchain_stats().await?;
    let blocks = fetch_recent_blocks(api, &stats.recent_blocks, limit).await;
    Ok(DashboardSnapshot {
        height: stats.height,
        utxo_count: stats.utxo_count,
        difficulty: stats.difficulty,
        recent_blocks: stats.recent_blocks,
        blocks,
    })
}

/// Fan-out detail fetch. Failed fetches are dropped; survivors keep the input order.
pub async fn fetch_recent_blocks(
    api: &dyn NodeApi,
    recent: &[RecentBlock],
    limit: usize,
) -> Vec<LoadedBlock> {
    let wanted = &recent[..recent.len().min(limit.min(MAX_RECENT_BLOCKS))];
    let fetches = wanted.iter().map(|summary| async move {
        match api.block_by_height(summary.height).await {
            Ok(detail) => Some(LoadedBlock {
                summary: summary.clone(),
                detail,
            }),
            Err(e) => {
                debug!(height = summary.height, error = %e, "dashboard.block.dropped");
                None
            }
        }
    });
    // join_all yields results in input order regardless of completion order.
    join_all(fetches).await.into_iter().flatten().collect()
}

// ============================================================================
// Rendering
// ============================================================================

/// One row of the recent-blocks list or a search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockItem {
    pub height: u64,
    pub title: String,
    pub time: String,
    pub hash: String,
    pub tx_count: usize,
    pub difficulty: u64,
}

impl BlockItem {
    fn new(detail: &BlockDetail, hash: &str) -> Self {
        BlockItem {
            height: detail.height,
            title: format!("Block #{}", detail.height),
            time: format_time(detail.timestamp),
            hash: format_hash(hash),
            tx_count: detail.transactions.len(),
            difficulty: detail.difficulty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockList {
    Items(Vec<BlockItem>),
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub online: bool,
    pub block_height: String,
    pub utxo_count: String,
    pub difficulty: String,
    pub total_area: String,
    pub blocks: BlockList,
}

impl DashboardView {
    /// Shown before the first refresh lands.
    pub fn loading() -> Self {
        let dash = "-".to_string();
        DashboardView {
            online: false,
            block_height: dash.clone(),
            utxo_count: dash.clone(),
            difficulty: dash.clone(),
            total_area: dash,
            blocks: BlockList::Message("Loading...".to_string()),
        }
    }

    /// Every field shows the sentinel; no stale numbers survive.
    pub fn offline() -> Self {
        DashboardView {
            online: false,
            block_height: OFFLINE.to_string(),
            utxo_count: OFFLINE.to_string(),
            difficulty: OFFLINE.to_string(),
            total_area: OFFLINE.to_string(),
            blocks: BlockList::Message(OFFLINE_MESSAGE.to_string()),
        }
    }

    pub fn from_snapshot(snapshot: &DashboardSnapshot) -> Self {
        let blocks = if snapshot.recent_blocks.is_empty() {
            BlockList::Message(NO_BLOCKS_MESSAGE.to_string())
        } else {
            BlockList::Items(
                snapshot
                    .blocks
                    .iter()
                    .map(|b| BlockItem::new(&b.detail, &b.summary.hash))
                    .collect(),
            )
        };
        DashboardView {
            online: true,
            block_height: snapshot.height.to_string(),
            utxo_count: snapshot.utxo_count.to_string(),
            difficulty: snapshot.difficulty.to_string(),
            total_area: format!("{:.2}", snapshot.utxo_count as f64 * AREA_PER_UTXO),
            blocks,
        }
    }

    pub fn render(result: &Result<DashboardSnapshot>) -> Self {
        match result {
            Ok(snapshot) => Self::from_snapshot(snapshot),
            Err(_) => Self::offline(),
        }
    }
}

/// Ticket for one refresh cycle; later tickets win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

/// Holds the currently rendered view and discards responses older than it.
#[derive(Debug)]
pub struct DashboardBoard {
    next: u64,
    rendered: Option<RefreshTicket>,
    view: DashboardView,
}

impl Default for DashboardBoard {
    fn default() -> Self {
        DashboardBoard {
            next: 0,
            rendered: None,
            view: DashboardView::loading(),
        }
    }
}

impl DashboardBoard {
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.next += 1;
        RefreshTicket(self.next)
    }

    /// Installs `view` unless a newer refresh is already on screen.
    pub fn publish(&mut self, ticket: RefreshTicket, view: DashboardView) -> bool {
        if self.rendered.is_some_and(|current| current > ticket) {
            debug!(ticket = ticket.0, "dashboard.refresh.stale");
            return false;
        }
        self.rendered = Some(ticket);
        self.view = view;
        true
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }
}

// ============================================================================
// Block lookup
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionItem {
    pub hash: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockDetailPanel {
    Loaded {
        title: String,
        hash: String,
        previous_hash: String,
        time: String,
        difficulty: u64,
        nonce: u64,
        transactions: Vec<TransactionItem>,
        /// Set when the block carries no transactions.
        empty_message: Option<String>,
    },
    Unavailable(String),
}

impl BlockDetailPanel {
    pub fn from_detail(block: &BlockDetail) -> Self {
        let transactions: Vec<TransactionItem> = block
            .transactions
            .iter()
            .map(|tx| TransactionItem {
                hash: format_hash(&tx.hash),
                time: format_time(tx.timestamp),
            })
            .collect();
        let empty_message = transactions
            .is_empty()
            .then(|| NO_TRANSACTIONS.to_string());
        BlockDetailPanel::Loaded {
            title: format!("Block #{}", block.height),
            hash: format_hash(&block.hash),
            previous_hash: format_hash(&block.previous_hash),
            time: format_time(block.timestamp),
            difficulty: block.difficulty,
            nonce: block.nonce,
            transactions,
            empty_message,
        }
    }
}

/// Fetches one block for the detail view. Not cached.
pub async fn block_details(api: &dyn NodeApi, height: u64) -> BlockDetailPanel {
    match api.block_by_height(height).await {
        Ok(block) => BlockDetailPanel::from_detail(&block),
        Err(e) => {
            warn!(height, error = %e, "dashboard.block_details.failed");
            BlockDetailPanel::Unavailable(BLOCK_DETAILS_UNAVAILABLE.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Found(BlockItem),
    NotFound(String),
}

/// Looks a block up by height when the query is numeric, by hash otherwise.
/// An empty query does nothing.
pub async fn search(api: &dyn NodeApi, query: &str) -> Option<SearchResult> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let result = match query.parse::<u64>() {
        Ok(height) => api.block_by_height(height).await,
        Err(_) => api.block_by_hash(query).await,
    };
    Some(match result {
        Ok(block) => SearchResult::Found(BlockItem::new(&block, &block.hash)),
        Err(e) => {
            debug!(query, error = %e, "dashboard.search.miss");
            SearchResult::NotFound(BLOCK_NOT_FOUND.to_string())
        }
    })
}
