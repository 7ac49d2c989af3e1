use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::HeatmapError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Selectable baskets of tickers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "KOSPI")]
    Kospi,
    #[serde(rename = "KOSDAQ")]
    Kosdaq,
    #[serde(rename = "S&P500")]
    Sp500,
    #[serde(rename = "Nasdaq")]
    Nasdaq,
    #[serde(rename = "Dow")]
    Dow,
    #[serde(rename = "ETF")]
    Etf,
}

impl Market {
    pub fn all() -> [Market; 6] {
        [
            Market::Kospi,
            Market::Kosdaq,
            Market::Sp500,
            Market::Nasdaq,
            Market::Dow,
            Market::Etf,
        ]
    }

    /// Display label, as shown in the market selector
    pub fn label(&self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
            Market::Sp500 => "S&P500",
            Market::Nasdaq => "Nasdaq",
            Market::Dow => "Dow",
            Market::Etf => "ETF",
        }
    }

    /// URL-safe identifier
    pub fn slug(&self) -> &'static str {
        match self {
            Market::Kospi => "kospi",
            Market::Kosdaq => "kosdaq",
            Market::Sp500 => "sp500",
            Market::Nasdaq => "nasdaq",
            Market::Dow => "dow",
            Market::Etf => "etf",
        }
    }
}

impl Default for Market {
    fn default() -> Self {
        Market::Kospi
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Market {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Market::all()
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s) || m.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| HeatmapError::InvalidData(format!("unknown market: {}", s)))
    }
}

/// Lookback window for a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Period {
    /// Periods offered for the heatmap. `ThreeMonths` is reserved for the detail chart.
    pub fn selectable() -> [Period; 3] {
        [Period::OneDay, Period::FiveDays, Period::OneMonth]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
        }
    }

    /// Provider `range` parameter
    pub fn range(&self) -> &'static str {
        self.as_str()
    }

    /// Bar interval requested for this window. A single trading day only has
    /// one daily bar, so it is sampled intraday instead.
    pub fn interval(&self) -> &'static str {
        match self {
            Period::OneDay => "5m",
            Period::FiveDays | Period::OneMonth | Period::ThreeMonths => "1d",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::OneDay
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            other => Err(HeatmapError::InvalidData(format!("unknown period: {}", other))),
        }
    }
}

/// Row ordering applied by the table view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    ChangeDesc,
    ChangeAsc,
    MarketCapDesc,
}

impl SortMode {
    pub fn all() -> [SortMode; 3] {
        [SortMode::ChangeDesc, SortMode::ChangeAsc, SortMode::MarketCapDesc]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::ChangeDesc => "change_desc",
            SortMode::ChangeAsc => "change_asc",
            SortMode::MarketCapDesc => "market_cap_desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::ChangeDesc => "Biggest gainers",
            SortMode::ChangeAsc => "Biggest losers",
            SortMode::MarketCapDesc => "Largest market cap",
        }
    }
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::ChangeDesc
    }
}

impl FromStr for SortMode {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortMode::all()
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| HeatmapError::InvalidData(format!("unknown sort mode: {}", s)))
    }
}

/// One successfully loaded symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Price", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(rename = "Change (%)", with = "rust_decimal::serde::float")]
    pub change_pct: Decimal,
    #[serde(rename = "MarketCap")]
    pub market_cap: f64,
    #[serde(rename = "Sector")]
    pub sector: String,
    /// Market cap was unavailable and a placeholder weight was used
    #[serde(default)]
    pub market_cap_defaulted: bool,
}

/// Rows loaded for one (symbol set, period) combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTable {
    pub period: Period,
    pub rows: Vec<QuoteRow>,
    pub fetched_at: DateTime<Utc>,
}

impl QuoteTable {
    pub fn empty(period: Period, fetched_at: DateTime<Utc>) -> Self {
        Self {
            period,
            rows: Vec::new(),
            fetched_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Percent change from `first` to `last`. `None` when `first` is zero or either
/// input is not finite.
pub fn percent_change(first: f64, last: f64) -> Option<f64> {
    if !first.is_finite() || !last.is_finite() || first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Round to two decimal places, half away from zero.
pub fn round_2dp(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
