//! Cryptographic primitives for the dashboard client
//!
//! Transactions are fingerprinted with SHA-256 over a canonical string and the
//! fingerprint is signed with ECDSA over secp256k1. Signatures travel as
//! hex-encoded DER so the node can verify them with any standard library.

use crate::error::{DashboardError, Result};
use crate::transaction::Transaction;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Version of the canonical transaction string fed to [`hash_transaction`].
///
/// Version 1 is `from_address ++ to_address ++ decimal(amount)` with no
/// separators. Any change to field order or formatting must bump this, since
/// the node recomputes the same fingerprint to check signatures.
pub const TX_HASH_VERSION: u8 = 1;

/// Fixed-size SHA-256 fingerprint of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxDigest([u8; 32]);

impl TxDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Deterministic fingerprint of a transaction's content.
pub fn hash_transaction(tx: &Transaction) -> TxDigest {
    TxDigest(Sha256::digest(tx.canonical_string().as_bytes()).into())
}

/// Parses a hex secret key.
///
/// Shorter inputs are treated as big-endian scalars and left-padded with
/// zeros, so `"deadbeef"` is the scalar `0xdeadbeef`.
pub fn parse_secret_key(secret_key_hex: &str) -> Result<SecretKey> {
    let trimmed = secret_key_hex.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(DashboardError::InvalidKey("secret key is empty".to_string()));
    }
    if trimmed.len() > SECRET_KEY_SIZE * 2 {
        return Err(DashboardError::InvalidKey(format!(
            "Secret key must be at most {} bytes, got {} hex chars",
            SECRET_KEY_SIZE,
            trimmed.len()
        )));
    }

    let padded = format!("{:0>width$}", trimmed, width = SECRET_KEY_SIZE * 2);
    let bytes = hex::decode(&padded)
        .map_err(|e| DashboardError::InvalidKey(format!("Invalid hex secret key: {}", e)))?;

    SecretKey::from_slice(&bytes)
        .map_err(|e| DashboardError::InvalidKey(format!("Invalid secret key bytes: {}", e)))
}

/// Signs a transaction digest and returns the signature as hex-encoded DER.
///
/// The digest is signed as-is (it is already a SHA-256 output). Nonces follow
/// RFC 6979, so the same digest and key always yield the same signature.
pub fn sign(digest: &TxDigest, secret_key_hex: &str) -> Result<String> {
    let secret_key = parse_secret_key(secret_key_hex)?;
    let message = Message::from_digest(digest.0);
    let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &secret_key);
    Ok(hex::encode(signature.serialize_der().to_vec()))
}

/// Verifies a hex-DER signature against a digest and a hex compressed public key.
pub fn verify(digest: &TxDigest, signature_hex: &str, public_key_hex: &str) -> Result<()> {
    let public_key_bytes = hex::decode(public_key_hex.trim())
        .map_err(|e| DashboardError::InvalidKey(format!("Invalid hex public key: {}", e)))?;
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(DashboardError::InvalidKey(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    let public_key = PublicKey::from_slice(&public_key_bytes)
        .map_err(|e| DashboardError::InvalidKey(format!("Invalid public key: {}", e)))?;

    let der = hex::decode(signature_hex.trim())
        .map_err(|e| DashboardError::InvalidKey(format!("Invalid hex signature: {}", e)))?;
    let mut signature = Signature::from_der(&der)
        .map_err(|e| DashboardError::InvalidKey(format!("Invalid signature: {}", e)))?;
    // Other signers do not always emit low-S signatures.
    signature.normalize_s();

    let message = Message::from_digest(digest.0);
    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| DashboardError::InvalidKey("Signature verification failed".to_string()))
}

#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_hex(secret_key_hex: &str) -> Result<Self> {
        Ok(Self::from_secret_key(parse_secret_key(secret_key_hex)?))
    }

    /// Node address: hex SHA-256 of the compressed public key.
    pub fn address(&self) -> String {
        let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = self.public_key.serialize();
        hex::encode(Sha256::digest(pubkey_bytes))
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }
}
