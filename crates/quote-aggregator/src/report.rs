//! Per-batch accounting of skipped symbols

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a symbol produced no row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Provider returned no bars at all
    NoHistory,
    /// Fewer than two bars in the window
    InsufficientHistory(usize),
    /// First or last close unusable for a percent change
    InvalidPrice,
    /// Market cap unavailable and the policy excludes such rows
    MissingMarketCap,
    FetchFailed(String),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::NoHistory => "no_history",
            SkipReason::InsufficientHistory(_) => "insufficient_history",
            SkipReason::InvalidPrice => "invalid_price",
            SkipReason::MissingMarketCap => "missing_market_cap",
            SkipReason::FetchFailed(_) => "fetch_failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoHistory => write!(f, "no price history"),
            SkipReason::InsufficientHistory(n) => write!(f, "only {} data point(s)", n),
            SkipReason::InvalidPrice => write!(f, "invalid reference price"),
            SkipReason::MissingMarketCap => write!(f, "market cap unavailable"),
            SkipReason::FetchFailed(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

/// Outcome counts for one aggregation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub requested: usize,
    pub loaded: usize,
    pub skipped: Vec<SkippedSymbol>,
    /// Rows kept with a placeholder market cap
    pub defaulted_market_caps: usize,
    /// Fundamentals lookups that failed and were handled as unavailable
    pub market_cap_errors: usize,
}

impl BatchReport {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    pub(crate) fn skip(&mut self, symbol: &str, reason: SkipReason) {
        tracing::debug!("Skipping {}: {}", symbol, reason);
        self.skipped.push(SkippedSymbol {
            symbol: symbol.to_string(),
            reason,
        });
    }

    /// Number of skipped symbols per reason kind
    pub fn skipped_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.skipped {
            *counts.entry(s.reason.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
