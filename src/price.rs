//! Reference price ticker shown next to the chain stats
//!
//! Purely informational: a failed fetch adds no sample and is otherwise ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use crate::error::{DashboardError, Result};

pub const PRICE_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd";
/// Two hours of samples at the default cadence.
pub const PRICE_HISTORY_LEN: usize = 120;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current price in USD.
    async fn fetch_price(&self) -> Result<f64>;
}

#[derive(Deserialize)]
struct UsdQuote {
    usd: f64,
}

#[derive(Deserialize)]
struct PriceResponse {
    bitcoin: UsdQuote,
}

pub fn parse_price(body: &str) -> Result<f64> {
    let response: PriceResponse = serde_json::from_str(body)?;
    Ok(response.bitcoin.usd)
}

#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    http: Client,
    url: Url,
}

impl HttpPriceSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| DashboardError::Config(format!("price_url {:?}: {}", url, e)))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self) -> Result<f64> {
        let response = self.http.get(self.url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DashboardError::http_status(status.as_u16(), &body));
        }
        parse_price(&body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub at: DateTime<Utc>,
    pub usd: f64,
}

/// Bounded series of samples, oldest first.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    samples: VecDeque<PriceSample>,
    capacity: usize,
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::with_capacity(PRICE_HISTORY_LEN)
    }
}

impl PriceHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        PriceHistory {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: PriceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    pub fn samples(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Takes one sample. Errors and non-positive prices yield nothing.
pub async fn sample(source: &dyn PriceSource) -> Option<PriceSample> {
    match source.fetch_price().await {
        Ok(usd) if usd.is_finite() && usd > 0.0 => Some(PriceSample {
            at: Utc::now(),
            usd,
        }),
        Ok(usd) => {
            debug!(usd, "price.sample.ignored");
            None
        }
        Err(e) => {
            debug!(error = %e, "price.sample.failed");
            None
        }
    }
}
