use async_trait::async_trait;
use heatmap_core::{Bar, HeatmapError, MarketDataProvider, Period};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

mod rate_limit;
mod response;

use rate_limit::RateLimiter;
use response::{ChartEnvelope, SummaryEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const MAX_ATTEMPTS: u32 = 3;

/// Connection settings for [`YahooClient`]
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    /// Requests allowed per minute
    pub rate_limit: usize,
    pub timeout: Duration,
    /// Pause before retrying a 429 response
    pub retry_backoff: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit: 120,
            timeout: Duration::from_secs(15),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
    retry_backoff: Duration,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Result<Self, HeatmapError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| HeatmapError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(60)),
            retry_backoff: config.retry_backoff,
        })
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, HeatmapError> {
        let request = builder.build().map_err(|e| HeatmapError::ApiError(e.to_string()))?;

        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| HeatmapError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| HeatmapError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/{}",
                self.retry_backoff.as_secs(),
                attempt + 1,
                MAX_ATTEMPTS
            );
            tokio::time::sleep(self.retry_backoff).await;
        }

        Err(HeatmapError::RateLimited(format!(
            "Rate limited by Yahoo after {} retries",
            MAX_ATTEMPTS
        )))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, HeatmapError> {
        let response = self.send_request(self.client.get(url).query(query)).await?;

        // Yahoo reports unknown symbols as 404 with a JSON error body, so only
        // treat non-JSON failures as transport errors.
        let status = response.status();
        if !status.is_success() && status.as_u16() != 404 {
            return Err(HeatmapError::ApiError(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| HeatmapError::ApiError(e.to_string()))
    }

    /// Get price bars for a symbol over a lookback period
    pub async fn get_chart(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, HeatmapError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let envelope: ChartEnvelope = self
            .get_json(&url, &[("range", period.range()), ("interval", period.interval())])
            .await?;
        let bars = envelope.into_bars(symbol)?;
        tracing::debug!("Fetched {} bars for {} ({})", bars.len(), symbol, period);
        Ok(bars)
    }

    /// Get market capitalization from the price module
    pub async fn get_market_cap(&self, symbol: &str) -> Result<Option<f64>, HeatmapError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let envelope: SummaryEnvelope = self.get_json(&url, &[("modules", "price")]).await?;
        envelope.into_market_cap(symbol)
    }

    /// Get the top holdings of a fund
    pub async fn get_top_holdings(&self, etf: &str) -> Result<Vec<String>, HeatmapError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, etf);
        let envelope: SummaryEnvelope = self.get_json(&url, &[("modules", "topHoldings")]).await?;
        envelope.into_holdings(etf)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn history(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, HeatmapError> {
        self.get_chart(symbol, period).await
    }

    async fn market_cap(&self, symbol: &str) -> Result<Option<f64>, HeatmapError> {
        self.get_market_cap(symbol).await
    }

    async fn fund_holdings(&self, etf: &str) -> Result<Vec<String>, HeatmapError> {
        self.get_top_holdings(etf).await
    }
}
