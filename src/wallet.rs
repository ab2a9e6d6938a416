//! Lightweight session wallet: one address/secret-key pair at a time
//!
//! A wallet is either issued by the node (`POST /wallet/create`) or loaded from
//! user-supplied JSON. Balance is the number of UTXOs the node reports for the
//! address, not their summed value.

use crate::api::NodeApi;
use crate::error::{DashboardError, Result};
use crate::format::format_hash;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    /// Hex secret key. The node API calls it `private_key`.
    #[serde(alias = "private_key")]
    secret_key: String,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Wallet {
    pub fn new(address: String, secret_key: String) -> Self {
        Wallet {
            address,
            secret_key,
        }
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Both halves present.
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty() && !self.secret_key.trim().is_empty()
    }

    /// Parses wallet JSON of the form `{"address": "...", "secret_key": "..."}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let wallet: Wallet = serde_json::from_str(json)
            .map_err(|e| DashboardError::MalformedWallet(e.to_string()))?;
        if !wallet.is_complete() {
            return Err(DashboardError::MalformedWallet(
                "address and secret_key must both be non-empty".to_string(),
            ));
        }
        Ok(wallet)
    }

    /// Exported form, suitable for loading back with [`Wallet::from_json`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Asks the node for a fresh keypair and address.
pub async fn create(api: &dyn NodeApi) -> Result<Wallet> {
    let wallet = api.create_wallet().await.map_err(|e| {
        warn!(error = %e, "wallet.create.failed");
        DashboardError::ServiceUnavailable(e.to_string())
    })?;
    if !wallet.is_complete() {
        return Err(DashboardError::MalformedResponse(
            "node returned a wallet without address or secret key".to_string(),
        ));
    }
    info!(address = %wallet.address, "wallet.create");
    Ok(wallet)
}

/// Balance as displayed: a UTXO count, or unknown when the lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Balance {
    Known(u64),
    #[default]
    Unknown,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Known(count) => write!(f, "{}", count),
            Balance::Unknown => f.write_str("unknown"),
        }
    }
}

/// Counts the UTXOs owned by `address`. Never fails: errors become [`Balance::Unknown`].
pub async fn balance(api: &dyn NodeApi, address: &str) -> Balance {
    match api.utxos(address).await {
        Ok(utxos) => Balance::Known(utxos.len() as u64),
        Err(e) => {
            warn!(address = %address, error = %e, "wallet.balance.failed");
            Balance::Unknown
        }
    }
}

/// Wallet half of the session context.
#[derive(Debug, Clone, Default)]
pub struct WalletState {
    active: Option<Wallet>,
    balance: Balance,
}

impl WalletState {
    pub fn active(&self) -> Option<&Wallet> {
        self.active.as_ref()
    }

    /// Installs a new wallet; the old balance no longer applies.
    pub fn replace(&mut self, wallet: Wallet) {
        self.active = Some(wallet);
        self.balance = Balance::Unknown;
    }

    /// Records a balance only if it belongs to the wallet still active.
    pub fn set_balance(&mut self, address: &str, balance: Balance) -> bool {
        match &self.active {
            Some(w) if w.address == address => {
                self.balance = balance;
                true
            }
            _ => false,
        }
    }

    pub fn panel(&self) -> WalletPanel {
        match &self.active {
            Some(w) => WalletPanel {
                address: format_hash(&w.address),
                balance: self.balance.to_string(),
            },
            None => WalletPanel {
                address: "No wallet".to_string(),
                balance: "-".to_string(),
            },
        }
    }
}

/// Render-ready wallet panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletPanel {
    pub address: String,
    pub balance: String,
}
