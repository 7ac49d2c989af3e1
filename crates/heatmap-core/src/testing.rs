//! In-memory [`MarketDataProvider`] for tests.

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Bar, HeatmapError, MarketDataProvider, Period};

/// Serves canned closes, market caps and holdings, and counts every call.
#[derive(Default)]
pub struct StaticProvider {
    closes: HashMap<String, Vec<f64>>,
    market_caps: HashMap<String, f64>,
    holdings: HashMap<String, Vec<String>>,
    failing: Vec<String>,
    failing_market_caps: Vec<String>,
    history_calls: AtomicUsize,
    market_cap_calls: AtomicUsize,
    holdings_calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.closes.insert(symbol.to_string(), closes.to_vec());
        self
    }

    pub fn with_market_cap(mut self, symbol: &str, cap: f64) -> Self {
        self.market_caps.insert(symbol.to_string(), cap);
        self
    }

    pub fn with_holdings(mut self, etf: &str, holdings: &[&str]) -> Self {
        self.holdings
            .insert(etf.to_string(), holdings.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Every call for `symbol` returns an API error
    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    /// Only the fundamentals call for `symbol` returns an API error
    pub fn failing_market_cap(mut self, symbol: &str) -> Self {
        self.failing_market_caps.push(symbol.to_string());
        self
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn market_cap_calls(&self) -> usize {
        self.market_cap_calls.load(Ordering::SeqCst)
    }

    pub fn holdings_calls(&self) -> usize {
        self.holdings_calls.load(Ordering::SeqCst)
    }

    fn check(&self, symbol: &str) -> Result<(), HeatmapError> {
        if self.failing.iter().any(|s| s == symbol) {
            return Err(HeatmapError::ApiError(format!("{}: connection reset", symbol)));
        }
        Ok(())
    }
}

/// Daily bars whose open/high/low bracket each close
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::days(i as i64),
            open: close * 0.99,
            high: close * 1.01,
            low: close * 0.98,
            close,
            volume: 1_000.0,
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn history(&self, symbol: &str, _period: Period) -> Result<Vec<Bar>, HeatmapError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.check(symbol)?;
        Ok(self
            .closes
            .get(symbol)
            .map(|c| bars_from_closes(c))
            .unwrap_or_default())
    }

    async fn market_cap(&self, symbol: &str) -> Result<Option<f64>, HeatmapError> {
        self.market_cap_calls.fetch_add(1, Ordering::SeqCst);
        self.check(symbol)?;
        if self.failing_market_caps.iter().any(|s| s == symbol) {
            return Err(HeatmapError::ApiError(format!("{}: quoteSummary unavailable", symbol)));
        }
        Ok(self.market_caps.get(symbol).copied())
    }

    async fn fund_holdings(&self, etf: &str) -> Result<Vec<String>, HeatmapError> {
        self.holdings_calls.fetch_add(1, Ordering::SeqCst);
        self.check(etf)?;
        self.holdings
            .get(etf)
            .cloned()
            .ok_or_else(|| HeatmapError::InvalidData(format!("{}: no holdings", etf)))
    }
}
