//! Transaction builder: validate, hash, sign, submit
//!
//! A send is exactly one submission. Nothing here retries: the transfer is
//! user-triggered and not idempotent, so the caller decides whether to try again.

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{parse_amount, validate_recipient};

use crate::api::NodeApi;
use crate::crypto;
use crate::error::{DashboardError, Result};
use crate::wallet::Wallet;
use tracing::{info, warn};

/// Validates the inputs, then hashes and signs the transfer. No network access.
pub fn build_signed(
    wallet: Option<&Wallet>,
    to_address: &str,
    amount: &str,
) -> Result<SignedTransaction> {
    let wallet = wallet
        .filter(|w| w.is_complete())
        .ok_or_else(|| DashboardError::invalid_input("Create or load a wallet first"))?;
    let to_address = validate_recipient(to_address)?;
    let amount = parse_amount(amount)?;

    let transaction = Transaction::new(&wallet.address, to_address, amount);
    let digest = transaction.hash();
    let signature = crypto::sign(&digest, wallet.secret_key())?;

    Ok(SignedTransaction {
        transaction,
        signature,
    })
}

/// Builds, signs and submits a transfer; returns the hash reported by the node.
pub async fn send(
    api: &dyn NodeApi,
    wallet: Option<&Wallet>,
    to_address: &str,
    amount: &str,
) -> Result<String> {
    let submission = build_signed(wallet, to_address, amount)?;
    let local_hash = submission.transaction.hash();

    match api.submit_transaction(&submission).await {
        Ok(tx_hash) => {
            info!(
                tx_hash = %tx_hash,
                local_hash = %local_hash,
                amount = submission.transaction.amount,
                "wallet.send"
            );
            Ok(tx_hash)
        }
        Err(e) => {
            warn!(local_hash = %local_hash, error = %e, "wallet.send.failed");
            Err(DashboardError::SubmissionFailed(e.to_string()))
        }
    }
}
