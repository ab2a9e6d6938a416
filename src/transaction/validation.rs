/// Validation of user-typed send parameters
use crate::error::{DashboardError, Result};

/// Parses a user-typed amount. Only plain non-negative integers are accepted.
pub fn parse_amount(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::invalid_input("Amount is required"));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(DashboardError::InvalidInput(format!(
            "Amount must be a non-negative integer, got {:?}",
            trimmed
        )));
    }
    trimmed
        .parse::<u64>()
        .map_err(|e| DashboardError::InvalidInput(format!("Amount out of range: {}", e)))
}

pub fn validate_recipient(to_address: &str) -> Result<&str> {
    let trimmed = to_address.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::invalid_input("Recipient address is required"));
    }
    Ok(trimmed)
}
