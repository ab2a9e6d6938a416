//! Configuration management for the dashboard client

use crate::dashboard::{DASHBOARD_REFRESH_INTERVAL, MAX_RECENT_BLOCKS};
use crate::error::{DashboardError, Result};
use crate::mining::MINING_POLL_INTERVAL;
use crate::price::{DEFAULT_PRICE_URL, PRICE_REFRESH_INTERVAL};
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const CONFIG_FILE: &str = "dashboard.toml";
/// Same-origin API path used when nothing else names a base.
pub const DEFAULT_API_PATH: &str = "/api";
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:3000";

/// Resolves the API base. Order matters and is fixed:
/// 1. the launch parameter handed over by whatever started the client,
/// 2. the `api` query parameter of the page URL,
/// 3. [`DEFAULT_API_PATH`].
///
/// Empty values are skipped.
pub fn resolve_api_base(launch_param: Option<&str>, page_url: Option<&str>) -> String {
    if let Some(param) = launch_param.map(str::trim).filter(|p| !p.is_empty()) {
        return param.to_string();
    }

    // An unparseable page URL just falls through to the default.
    if let Some(api) = page_url
        .and_then(|u| Url::parse(u).ok())
        .and_then(|u| {
            u.query_pairs()
                .find(|(key, _)| key == "api")
                .map(|(_, value)| value.trim().to_string())
        })
        .filter(|v| !v.is_empty())
    {
        return api;
    }

    DEFAULT_API_PATH.to_string()
}

/// Turns a resolved base into an absolute URL. Relative bases are taken
/// relative to `origin`, the way a browser resolves them against the page.
pub fn absolute_api_url(base: &str, origin: &Url) -> Result<Url> {
    match Url::parse(base) {
        Ok(url) => Ok(url),
        Err(_) => origin
            .join(base)
            .map_err(|e| DashboardError::Config(format!("Invalid API base {:?}: {}", base, e))),
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    dashboard: RawDashboardConfig,
}

#[derive(Debug, Deserialize, Default)]
struct RawDashboardConfig {
    origin: Option<String>,
    request_timeout: Option<String>,
    mining_poll_interval: Option<String>,
    dashboard_refresh_interval: Option<String>,
    price_refresh_interval: Option<String>,
    recent_block_limit: Option<usize>,
    cli_miner_address: Option<String>,
    price_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub origin: Url,
    pub request_timeout: Duration,
    pub mining_poll_interval: Duration,
    pub dashboard_refresh_interval: Duration,
    pub price_refresh_interval: Duration,
    pub recent_block_limit: usize,
    /// Address offered by the "load CLI wallet" control.
    pub cli_miner_address: Option<String>,
    pub price_url: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            origin: default_origin(),
            request_timeout: crate::api::DEFAULT_REQUEST_TIMEOUT,
            mining_poll_interval: MINING_POLL_INTERVAL,
            dashboard_refresh_interval: DASHBOARD_REFRESH_INTERVAL,
            price_refresh_interval: PRICE_REFRESH_INTERVAL,
            recent_block_limit: MAX_RECENT_BLOCKS,
            cli_miner_address: None,
            price_url: DEFAULT_PRICE_URL.to_string(),
        }
    }
}

fn default_origin() -> Url {
    Url::parse(DEFAULT_ORIGIN).expect("DEFAULT_ORIGIN is a valid URL")
}

fn parse_interval(name: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };
    let duration = humantime::parse_duration(value.trim())
        .map_err(|e| DashboardError::Config(format!("{} {:?}: {}", name, value, e)))?;
    if duration.is_zero() {
        return Err(DashboardError::Config(format!("{} must be greater than zero", name)));
    }
    Ok(duration)
}

impl TryFrom<RawDashboardConfig> for DashboardConfig {
    type Error = DashboardError;

    fn try_from(raw: RawDashboardConfig) -> Result<Self> {
        let defaults = DashboardConfig::default();

        let origin = match raw.origin {
            Some(origin) => Url::parse(origin.trim())
                .map_err(|e| DashboardError::Config(format!("origin {:?}: {}", origin, e)))?,
            None => defaults.origin,
        };

        let recent_block_limit = match raw.recent_block_limit {
            Some(0) => {
                return Err(DashboardError::Config(
                    "recent_block_limit must be at least 1".to_string(),
                ))
            }
            Some(n) if n > MAX_RECENT_BLOCKS => {
                warn!(requested = n, max = MAX_RECENT_BLOCKS, "config.recent_block_limit.clamped");
                MAX_RECENT_BLOCKS
            }
            Some(n) => n,
            None => defaults.recent_block_limit,
        };

        Ok(DashboardConfig {
            origin,
            request_timeout: parse_interval(
                "request_timeout",
                raw.request_timeout,
                defaults.request_timeout,
            )?,
            mining_poll_interval: parse_interval(
                "mining_poll_interval",
                raw.mining_poll_interval,
                defaults.mining_poll_interval,
            )?,
            dashboard_refresh_interval: parse_interval(
                "dashboard_refresh_interval",
                raw.dashboard_refresh_interval,
                defaults.dashboard_refresh_interval,
            )?,
            price_refresh_interval: parse_interval(
                "price_refresh_interval",
                raw.price_refresh_interval,
                defaults.price_refresh_interval,
            )?,
            recent_block_limit,
            cli_miner_address: raw
                .cli_miner_address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            price_url: raw.price_url.unwrap_or(defaults.price_url),
        })
    }
}

pub fn parse_config(contents: &str) -> Result<DashboardConfig> {
    let file: ConfigFile = toml::from_str(contents)?;
    file.dashboard.try_into()
}

/// Loads `path` (or `dashboard.toml`). A missing file means defaults.
pub fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DashboardConfig::default()),
        Err(e) => Err(DashboardError::Config(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://dash.example/index.html?api=https://node.example/api";

    #[test]
    fn test_launch_param_wins() {
        assert_eq!(
            resolve_api_base(Some("https://bot.example/api"), Some(PAGE)),
            "https://bot.example/api"
        );
    }

    #[test]
    fn test_query_param_is_second() {
        assert_eq!(resolve_api_base(None, Some(PAGE)), "https://node.example/api");
        assert_eq!(resolve_api_base(Some("  "), Some(PAGE)), "https://node.example/api");
    }

    #[test]
    fn test_default_is_relative_api() {
        assert_eq!(resolve_api_base(None, None), "/api");
        assert_eq!(resolve_api_base(None, Some("not a url")), "/api");
        assert_eq!(resolve_api_base(None, Some("https://dash.example/?api=")), "/api");
        assert_eq!(resolve_api_base(None, Some("https://dash.example/?other=1")), "/api");
    }

    #[test]
    fn test_absolute_api_url() {
        let origin = Url::parse("http://127.0.0.1:3000").unwrap();
        assert_eq!(
            absolute_api_url("/api", &origin).unwrap().as_str(),
            "http://127.0.0.1:3000/api"
        );
        assert_eq!(
            absolute_api_url("https://node.example/v1/api", &origin)
                .unwrap()
                .as_str(),
            "https://node.example/v1/api"
        );
    }

    #[test]
    fn test_parse_config_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.mining_poll_interval, Duration::from_secs(5));
        assert_eq!(config.dashboard_refresh_interval, Duration::from_secs(10));
        assert_eq!(config.price_refresh_interval, Duration::from_secs(60));
        assert_eq!(config.recent_block_limit, 5);
    }

    #[test]
    fn test_parse_config_values() {
        let config = parse_config(
            r#"
            [dashboard]
            origin = "http://10.0.0.2:8080"
            mining_poll_interval = "2s"
            request_timeout = "1500ms"
            recent_block_limit = 9
            cli_miner_address = " 7339ba1f "
            "#,
        )
        .unwrap();
        assert_eq!(config.origin.as_str(), "http://10.0.0.2:8080/");
        assert_eq!(config.mining_poll_interval, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert_eq!(config.recent_block_limit, MAX_RECENT_BLOCKS);
        assert_eq!(config.cli_miner_address.as_deref(), Some("7339ba1f"));
    }

    #[test]
    fn test_parse_config_rejects_bad_values() {
        assert!(parse_config("[dashboard]\nmining_poll_interval = \"soon\"").is_err());
        assert!(parse_config("[dashboard]\nmining_poll_interval = \"0s\"").is_err());
        assert!(parse_config("[dashboard]\nrecent_block_limit = 0").is_err());
        assert!(parse_config("[dashboard]\norigin = \"::\"").is_err());
        assert!(matches!(
            parse_config("dashboard = 3"),
            Err(DashboardError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = std::env::temp_dir().join("trinity-dashboard-config-missing");
        let config = load_config(Some(dir.join("nope.toml").as_path())).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }
}
