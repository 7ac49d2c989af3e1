use anyhow::{Context, Result};
use quote_aggregator::{AggregatorConfig, MissingMarketCapPolicy, DEFAULT_HOLDINGS_LIMIT, DEFAULT_TTL_SECS};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use yahoo_client::{YahooConfig, DEFAULT_BASE_URL};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,

    // Yahoo Finance
    pub yahoo_base_url: String,
    /// Requests per minute
    pub yahoo_rate_limit: usize,
    /// Per upstream request
    pub http_timeout_secs: u64,

    // Aggregation
    pub quote_cache_ttl_secs: i64,
    pub etf_holdings_limit: usize,
    pub missing_market_cap: MissingMarketCapPolicy,

    // Page
    /// 0 disables the refresh option
    pub auto_refresh_secs: u64,
    /// Whole request, including every symbol fetch
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            yahoo_base_url: DEFAULT_BASE_URL.to_string(),
            yahoo_rate_limit: 120,
            http_timeout_secs: 15,
            quote_cache_ttl_secs: DEFAULT_TTL_SECS,
            etf_holdings_limit: DEFAULT_HOLDINGS_LIMIT,
            missing_market_cap: MissingMarketCapPolicy::default(),
            auto_refresh_secs: 30,
            request_timeout_secs: 120,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let config = Self {
            bind_addr: parse_var(&lookup, "BIND_ADDR", d.bind_addr)?,
            yahoo_base_url: lookup("YAHOO_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(d.yahoo_base_url),
            yahoo_rate_limit: parse_var(&lookup, "YAHOO_RATE_LIMIT", d.yahoo_rate_limit)?,
            http_timeout_secs: parse_var(&lookup, "HTTP_TIMEOUT_SECS", d.http_timeout_secs)?,
            quote_cache_ttl_secs: parse_var(&lookup, "QUOTE_CACHE_TTL_SECS", d.quote_cache_ttl_secs)?,
            etf_holdings_limit: parse_var(&lookup, "ETF_HOLDINGS_LIMIT", d.etf_holdings_limit)?,
            missing_market_cap: parse_var(&lookup, "MISSING_MARKET_CAP", d.missing_market_cap)?,
            auto_refresh_secs: parse_var(&lookup, "AUTO_REFRESH_SECS", d.auto_refresh_secs)?,
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS", d.request_timeout_secs)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.yahoo_rate_limit == 0 {
            anyhow::bail!("YAHOO_RATE_LIMIT must be at least 1");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be at least 1");
        }
        if self.quote_cache_ttl_secs < 0 {
            anyhow::bail!("QUOTE_CACHE_TTL_SECS must not be negative");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn yahoo_config(&self) -> YahooConfig {
        YahooConfig {
            base_url: self.yahoo_base_url.clone(),
            rate_limit: self.yahoo_rate_limit,
            timeout: Duration::from_secs(self.http_timeout_secs),
            ..YahooConfig::default()
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            cache_ttl: chrono::Duration::seconds(self.quote_cache_ttl_secs),
            holdings_limit: self.etf_holdings_limit,
            missing_market_cap: self.missing_market_cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.quote_cache_ttl_secs, 300);
        assert_eq!(config.etf_holdings_limit, 20);
        assert_eq!(config.auto_refresh_secs, 30);
        assert_eq!(config.missing_market_cap, MissingMarketCapPolicy::DefaultToOne);
        assert_eq!(config.yahoo_config().timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("QUOTE_CACHE_TTL_SECS", "60"),
            ("MISSING_MARKET_CAP", "exclude"),
            ("YAHOO_BASE_URL", "http://localhost:4010"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.aggregator_config().cache_ttl, chrono::Duration::seconds(60));
        assert_eq!(config.missing_market_cap, MissingMarketCapPolicy::Exclude);
        assert_eq!(config.yahoo_config().base_url, "http://localhost:4010");
    }

    #[test]
    fn test_invalid_values_fail_with_context() {
        let err = AppConfig::from_lookup(lookup(&[("ETF_HOLDINGS_LIMIT", "lots")])).unwrap_err();
        assert!(format!("{:#}", err).contains("ETF_HOLDINGS_LIMIT"));

        assert!(AppConfig::from_lookup(lookup(&[("YAHOO_RATE_LIMIT", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("MISSING_MARKET_CAP", "guess")])).is_err());
    }
}
