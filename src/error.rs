//! Error types for the TrinityChain dashboard client

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DashboardError {
    /// The request never completed, or the node answered with a non-2xx status.
    #[error("Network failure: {0}")]
    NetworkFailure(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Malformed wallet: {0}")]
    MalformedWallet(String),
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("No wallet loaded")]
    NoWallet,
    #[error("Mining is already active")]
    MiningAlreadyActive,
    #[error("Mining is not active")]
    MiningNotActive,
    #[error("A mining command is already in flight")]
    CommandInFlight,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Builds a `NetworkFailure` from a non-2xx status and the body the node sent back.
    pub fn http_status(status: u16, body: &str) -> Self {
        DashboardError::NetworkFailure(format!("HTTP {}: {}", status, body.trim()))
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        DashboardError::InvalidInput(msg.into())
    }

    /// True for failures of the HTTP boundary itself, as opposed to local validation.
    pub fn is_boundary_failure(&self) -> bool {
        matches!(
            self,
            DashboardError::NetworkFailure(_)
                | DashboardError::MalformedResponse(_)
                | DashboardError::ServiceUnavailable(_)
                | DashboardError::SubmissionFailed(_)
        )
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::MalformedResponse(err.to_string())
        } else {
            DashboardError::NetworkFailure(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::MalformedResponse(err.to_string())
    }
}

impl From<toml::de::Error> for DashboardError {
    fn from(err: toml::de::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, DashboardError>;
