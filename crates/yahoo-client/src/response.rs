//! Yahoo Finance response shapes and their conversion into core types.

use chrono::DateTime;
use heatmap_core::{Bar, HeatmapError};
use serde::Deserialize;

// Chart (price history) response
#[derive(Debug, Deserialize)]
pub(crate) struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<YahooErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct YahooErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl YahooErrorBody {
    fn message(&self) -> String {
        format!(
            "{}: {}",
            self.code.as_deref().unwrap_or("error"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

// quoteSummary response (price and topHoldings modules)
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryBody {
    #[serde(default)]
    pub result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    pub error: Option<YahooErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResult {
    #[serde(default)]
    pub price: Option<PriceModule>,
    #[serde(default, rename = "topHoldings")]
    pub top_holdings: Option<TopHoldingsModule>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceModule {
    #[serde(default, rename = "marketCap")]
    pub market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawValue {
    #[serde(default)]
    pub raw: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopHoldingsModule {
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Holding {
    #[serde(default)]
    pub symbol: Option<String>,
}

impl ChartEnvelope {
    /// Convert into bars, dropping any interval with a missing OHLC value.
    pub(crate) fn into_bars(self, symbol: &str) -> Result<Vec<Bar>, HeatmapError> {
        if let Some(err) = self.chart.error {
            return Err(HeatmapError::ApiError(format!("{}: {}", symbol, err.message())));
        }

        let result = match self.chart.result.and_then(|r| r.into_iter().next()) {
            Some(result) => result,
            None => return Ok(Vec::new()),
        };

        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let bars = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let open = quote.open.get(i).copied().flatten()?;
                let high = quote.high.get(i).copied().flatten()?;
                let low = quote.low.get(i).copied().flatten()?;
                let close = quote.close.get(i).copied().flatten()?;
                let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
                Some(Bar {
                    timestamp: DateTime::from_timestamp(ts, 0)?,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect();

        Ok(bars)
    }
}

impl SummaryEnvelope {
    fn first_result(self, symbol: &str) -> Result<Option<SummaryResult>, HeatmapError> {
        if let Some(err) = self.quote_summary.error {
            return Err(HeatmapError::ApiError(format!("{}: {}", symbol, err.message())));
        }
        Ok(self.quote_summary.result.and_then(|r| r.into_iter().next()))
    }

    pub(crate) fn into_market_cap(self, symbol: &str) -> Result<Option<f64>, HeatmapError> {
        Ok(self
            .first_result(symbol)?
            .and_then(|r| r.price)
            .and_then(|p| p.market_cap)
            .and_then(|m| m.raw)
            .filter(|cap| cap.is_finite() && *cap >= 0.0))
    }

    pub(crate) fn into_holdings(self, symbol: &str) -> Result<Vec<String>, HeatmapError> {
        let module = self
            .first_result(symbol)?
            .and_then(|r| r.top_holdings)
            .ok_or_else(|| HeatmapError::InvalidData(format!("{}: no topHoldings module", symbol)))?;

        Ok(module
            .holdings
            .into_iter()
            .filter_map(|h| h.symbol)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
