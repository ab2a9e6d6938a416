//! Display helpers shared by the dashboard panels

use chrono::DateTime;

/// Shortens long hashes to `first8...last8`.
pub fn format_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() > 16 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        hash.to_string()
    }
}

/// Renders a unix timestamp (seconds) in UTC.
pub fn format_time(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "Invalid time".to_string(),
    }
}

pub fn format_hashrate(hashrate: f64) -> String {
    format!("{:.2} H/s", hashrate)
}
