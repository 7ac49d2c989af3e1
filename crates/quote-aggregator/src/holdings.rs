//! ETF holdings resolution

use heatmap_core::MarketDataProvider;

pub const DEFAULT_HOLDINGS_LIMIT: usize = 20;

/// Top constituents of `etf`, at most `limit` of them.
///
/// Any provider failure yields an empty list: the caller renders that as a
/// table with no rows rather than an error.
pub async fn holdings_of(provider: &dyn MarketDataProvider, etf: &str, limit: usize) -> Vec<String> {
    match provider.fund_holdings(etf).await {
        Ok(holdings) => {
            let mut seen = Vec::with_capacity(limit);
            for symbol in holdings {
                if seen.len() >= limit {
                    break;
                }
                if !seen.contains(&symbol) {
                    seen.push(symbol);
                }
            }
            tracing::debug!("Resolved {} holdings for {}", seen.len(), etf);
            seen
        }
        Err(e) => {
            tracing::debug!("Holdings unavailable for {}: {}", etf, e);
            Vec::new()
        }
    }
}
