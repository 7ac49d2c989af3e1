//! Sector filter, symbol search and sort over a quote table

use heatmap_core::{QuoteRow, QuoteTable, SortMode};
use std::collections::BTreeSet;

use crate::state::ViewState;

/// Distinct sectors present in `rows`, sorted
pub fn sectors_present(rows: &[QuoteRow]) -> BTreeSet<String> {
    rows.iter().map(|r| r.sector.clone()).collect()
}

/// Keep rows whose sector is allowed. `None` allows every sector.
pub fn apply_filter(rows: Vec<QuoteRow>, allowed: Option<&BTreeSet<String>>) -> Vec<QuoteRow> {
    match allowed {
        Some(allowed) => rows.into_iter().filter(|r| allowed.contains(&r.sector)).collect(),
        None => rows,
    }
}

/// Case-insensitive substring match on the symbol. Blank queries match everything.
pub fn apply_search(rows: Vec<QuoteRow>, query: &str) -> Vec<QuoteRow> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|r| r.symbol.to_lowercase().contains(&needle))
        .collect()
}

/// Stable sort on the field selected by `mode`
pub fn apply_sort(mut rows: Vec<QuoteRow>, mode: SortMode) -> Vec<QuoteRow> {
    match mode {
        SortMode::ChangeDesc => rows.sort_by(|a, b| b.change_pct.cmp(&a.change_pct)),
        SortMode::ChangeAsc => rows.sort_by(|a, b| a.change_pct.cmp(&b.change_pct)),
        SortMode::MarketCapDesc => rows.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap)),
    }
    rows
}

/// Filter, then search, then sort
pub fn apply_view(table: &QuoteTable, state: &ViewState) -> Vec<QuoteRow> {
    let rows = apply_filter(table.rows.clone(), state.sectors.as_ref());
    let rows = apply_search(rows, &state.search);
    apply_sort(rows, state.sort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use heatmap_core::Period;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn row(symbol: &str, change: Decimal, cap: f64, sector: &str) -> QuoteRow {
        QuoteRow {
            symbol: symbol.to_string(),
            price: dec!(100.00),
            change_pct: change,
            market_cap: cap,
            sector: sector.to_string(),
            market_cap_defaulted: false,
        }
    }

    fn sample() -> Vec<QuoteRow> {
        vec![
            row("AAPL", dec!(1.50), 3.0e12, "Technology"),
            row("JPM", dec!(-0.75), 5.0e11, "Financials"),
            row("MSFT", dec!(1.50), 3.2e12, "Technology"),
            row("V", dec!(2.10), 5.5e11, "Financials"),
            row("AMZN", dec!(-3.20), 1.9e12, "Consumer Discretionary"),
        ]
    }

    fn changes(rows: &[QuoteRow]) -> Vec<Decimal> {
        rows.iter().map(|r| r.change_pct).collect()
    }

    #[test]
    fn test_filter_keeps_only_allowed_sectors() {
        let allowed: BTreeSet<String> = ["Financials".to_string()].into_iter().collect();
        let rows = apply_filter(sample(), Some(&allowed));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| allowed.contains(&r.sector)));
    }

    #[test]
    fn test_filter_with_every_sector_is_noop() {
        let all = sectors_present(&sample());
        assert_eq!(apply_filter(sample(), Some(&all)), sample());
        assert_eq!(apply_filter(sample(), None), sample());
    }

    #[test]
    fn test_filter_with_empty_set_removes_everything() {
        assert!(apply_filter(sample(), Some(&BTreeSet::new())).is_empty());
    }

    #[test]
    fn test_sort_change_desc_is_non_increasing_and_stable() {
        let rows = apply_sort(sample(), SortMode::ChangeDesc);
        assert!(changes(&rows).windows(2).all(|w| w[0] >= w[1]));
        // AAPL and MSFT tie; input order survives
        let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["V", "AAPL", "MSFT", "JPM", "AMZN"]);
    }

    #[test]
    fn test_sort_change_asc_is_non_decreasing() {
        let rows = apply_sort(sample(), SortMode::ChangeAsc);
        assert!(changes(&rows).windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(rows[0].symbol, "AMZN");
    }

    #[test]
    fn test_sort_market_cap_desc() {
        let rows = apply_sort(sample(), SortMode::MarketCapDesc);
        assert!(rows.windows(2).all(|w| w[0].market_cap >= w[1].market_cap));
        assert_eq!(rows[0].symbol, "MSFT");
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let rows = apply_search(sample(), "  ms ");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "MSFT");
        assert_eq!(apply_search(sample(), "a").len(), 2);
        assert_eq!(apply_search(sample(), "   ").len(), 5);
    }

    #[test]
    fn test_apply_view_order_of_operations() {
        let table = QuoteTable {
            period: Period::FiveDays,
            rows: sample(),
            fetched_at: Utc::now(),
        };
        let state = ViewState {
            sectors: Some(["Technology".to_string(), "Financials".to_string()].into_iter().collect()),
            search: "j".to_string(),
            ..ViewState::default()
        };
        let rows = apply_view(&table, &state);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "JPM");
    }
}
