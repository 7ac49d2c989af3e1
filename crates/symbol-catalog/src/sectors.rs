//! Ticker-to-sector lookup

pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Sector label for a ticker, `"Unknown"` when it is not in the table
pub fn sector_of(symbol: &str) -> &'static str {
    match symbol {
        // Funds
        "SPY" | "QQQ" | "DIA" | "ARKK" | "SOXL" => "ETF",

        // Korea
        "005930.KS" | "000660.KS" => "Technology",
        "035420.KS" | "035720.KQ" => "Communication Services",
        "051910.KS" => "Materials",
        "086520.KQ" => "Industrials",

        // US
        "AAPL" | "MSFT" | "NVDA" | "AMD" | "AVGO" | "ADBE" | "CRM" | "ORCL" | "CSCO" | "INTC"
        | "QCOM" | "TXN" | "AMAT" | "MU" | "IBM" | "PLTR" => "Technology",
        "GOOGL" | "GOOG" | "META" | "NFLX" | "DIS" | "TMUS" | "VZ" | "ROKU" => "Communication Services",
        "AMZN" | "TSLA" | "HD" | "MCD" | "NKE" | "SBUX" | "BKNG" | "SHOP" => "Consumer Discretionary",
        "COST" | "PEP" | "KO" | "WMT" | "PG" => "Consumer Staples",
        "JPM" | "V" | "MA" | "GS" | "AXP" | "TRV" | "BAC" | "COIN" | "HOOD" => "Financials",
        "UNH" | "AMGN" | "JNJ" | "MRK" | "LLY" | "ISRG" | "CRSP" => "Healthcare",
        "CAT" | "HON" | "BA" | "MMM" | "GE" => "Industrials",
        "CVX" | "XOM" => "Energy",
        "LIN" => "Materials",
        "NEE" | "SO" => "Utilities",

        _ => UNKNOWN_SECTOR,
    }
}

/// Accent color for a sector header
pub fn sector_color(sector: &str) -> &'static str {
    match sector {
        "Technology" => "#00ccff",
        "Financials" => "#00cc88",
        "Healthcare" => "#ff6699",
        "Energy" => "#ff9933",
        "Consumer Discretionary" => "#9966ff",
        "Consumer Staples" => "#66cc99",
        "Industrials" => "#cc9933",
        "Materials" => "#999999",
        "Utilities" => "#ffcc00",
        "Real Estate" => "#cc6666",
        "Communication Services" => "#6699ff",
        "ETF" => "#3366cc",
        _ => "#888888",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::symbols_for;
    use heatmap_core::Market;

    #[test]
    fn test_unknown_default() {
        assert_eq!(sector_of("ZZZZ"), UNKNOWN_SECTOR);
        assert_eq!(sector_of(""), UNKNOWN_SECTOR);
    }

    #[test]
    fn test_funds_are_grouped_together() {
        for etf in symbols_for(Market::Etf) {
            assert_eq!(sector_of(etf), "ETF");
        }
    }

    #[test]
    fn test_catalog_symbols_are_mapped() {
        for market in Market::all() {
            for symbol in symbols_for(market) {
                assert_ne!(sector_of(symbol), UNKNOWN_SECTOR, "{} has no sector", symbol);
            }
        }
    }

    #[test]
    fn test_sector_color_fallback() {
        assert_eq!(sector_color("Technology"), "#00ccff");
        assert_eq!(sector_color(UNKNOWN_SECTOR), "#888888");
    }
}
