use async_trait::async_trait;
use crate::{Bar, HeatmapError, Period};

/// Source of price history, fundamentals and fund holdings.
///
/// Every call is fallible; callers decide how a failure degrades
/// (a skipped row, an empty holdings list, a "no chart" notice).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// OHLC history for `symbol` over `period`, oldest bar first.
    async fn history(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, HeatmapError>;

    /// Market capitalization from the fundamentals snapshot, `None` when the
    /// provider has no figure for the symbol.
    async fn market_cap(&self, symbol: &str) -> Result<Option<f64>, HeatmapError>;

    /// Constituent tickers of a fund, largest weight first.
    async fn fund_holdings(&self, etf: &str) -> Result<Vec<String>, HeatmapError>;
}
