//! Market baskets

use heatmap_core::Market;
use serde::Serialize;

const KOSPI: &[&str] = &["005930.KS", "000660.KS", "035420.KS", "051910.KS"];
const KOSDAQ: &[&str] = &["035720.KQ", "086520.KQ"];
const SP500: &[&str] = &["AAPL", "MSFT", "NVDA", "AMZN", "GOOGL"];
const NASDAQ: &[&str] = &["NVDA", "AMD", "META", "TSLA"];
const DOW: &[&str] = &["AAPL", "MSFT", "JPM", "V"];
const ETF: &[&str] = &["SPY", "QQQ", "DIA", "ARKK", "SOXL"];

/// Ordered ticker list for a market
pub fn symbols_for(market: Market) -> &'static [&'static str] {
    match market {
        Market::Kospi => KOSPI,
        Market::Kosdaq => KOSDAQ,
        Market::Sp500 => SP500,
        Market::Nasdaq => NASDAQ,
        Market::Dow => DOW,
        Market::Etf => ETF,
    }
}

/// Funds whose holdings can be expanded into a heatmap
pub fn etf_choices() -> &'static [&'static str] {
    ETF
}

pub fn is_etf_choice(symbol: &str) -> bool {
    ETF.iter().any(|s| s.eq_ignore_ascii_case(symbol))
}

/// Serializable view of one market, for catalog listings
#[derive(Debug, Clone, Serialize)]
pub struct MarketListing {
    pub name: &'static str,
    pub slug: &'static str,
    pub symbols: &'static [&'static str],
}

impl MarketListing {
    pub fn all() -> Vec<MarketListing> {
        Market::all()
            .into_iter()
            .map(|m| MarketListing {
                name: m.label(),
                slug: m.slug(),
                symbols: symbols_for(m),
            })
            .collect()
    }
}
