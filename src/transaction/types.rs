//! Transaction types submitted by the dashboard wallet

use crate::crypto::{hash_transaction, TxDigest};
use serde::{Deserialize, Serialize};

/// A transfer as the wallet builds it. Immutable once hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from_address: String,
    pub to_address: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from_address: &str, to_address: &str, amount: u64) -> Self {
        Transaction {
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount,
        }
    }

    /// The exact string that gets hashed (see [`crate::crypto::TX_HASH_VERSION`]).
    pub fn canonical_string(&self) -> String {
        format!("{}{}{}", self.from_address, self.to_address, self.amount)
    }

    pub fn hash(&self) -> TxDigest {
        hash_transaction(self)
    }
}

/// Body of `POST /wallet/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    /// Hex-encoded DER ECDSA signature over the transaction digest.
    pub signature: String,
}
