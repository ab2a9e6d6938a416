//! TrinityChain Dashboard - client for a TrinityChain node's HTTP API
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Node Boundary
//! - [`api`] - HTTP client for the node API and its wire types
//! - [`config`] - API base resolution and `dashboard.toml`
//!
//! ## Wallet & Transactions
//! - [`crypto`] - Transaction hashing and secp256k1 signing
//! - [`transaction`] - Transaction building, validation and submission
//! - [`wallet`] - Session wallet and UTXO-count balance
//!
//! ## Views
//! - [`dashboard`] - Chain stats, recent blocks, search and block details
//! - [`mining`] - Mining control state machine
//! - [`price`] - Reference price ticker
//! - [`format`] - Display helpers
//!
//! ## Runtime
//! - [`session`] - Session context tying the views together
//! - [`scheduler`] - Periodic background jobs
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Node Boundary
// ============================================================================
pub mod api;
pub mod config;

// ============================================================================
// Wallet & Transactions
// ============================================================================
pub mod crypto;
pub mod transaction;
pub mod wallet;

// ============================================================================
// Views
// ============================================================================
pub mod dashboard;
pub mod format;
pub mod mining;
pub mod price;

// ============================================================================
// Runtime
// ============================================================================
pub mod error;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod testing;

pub use error::{DashboardError, Result};
pub use session::{NullPresenter, Presenter, Session, SessionTasks};
