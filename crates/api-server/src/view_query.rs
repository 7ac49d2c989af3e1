//! Dashboard selections carried in the query string

use heatmap_core::{Market, Period, SortMode};
use heatmap_view::{reduce, Action, ChartKind, ViewState};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::AppError;

/// `?market=sp500&period=5d&sector=Technology&sector=Energy&sort=change_asc&q=a`
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub market: Option<String>,
    pub period: Option<String>,
    pub etf: Option<String>,
    #[serde(default)]
    pub sector: Vec<String>,
    /// Market the `sector` values were offered for, see [`sector_scope`]
    pub sector_market: Option<String>,
    pub sort: Option<String>,
    pub q: Option<String>,
    pub symbol: Option<String>,
    pub chart: Option<String>,
    pub refresh: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Which basket a sector list belongs to: the market slug, or `etf:<fund>`.
pub fn sector_scope(state: &ViewState) -> String {
    match (state.market, &state.etf) {
        (Market::Etf, Some(etf)) => format!("etf:{}", etf),
        (market, _) => market.slug().to_string(),
    }
}

impl ViewQuery {
    /// Actions that take the default state to the requested one. Market
    /// comes first because selecting it resets the dependent selections.
    pub fn actions(&self) -> Result<Vec<Action>, AppError> {
        let mut actions = Vec::new();

        if let Some(market) = present(&self.market) {
            let market: Market = market.parse().map_err(AppError::bad_request)?;
            actions.push(Action::SelectMarket(market));
        }
        if let Some(etf) = present(&self.etf) {
            actions.push(Action::SelectEtf(etf.to_string()));
        }
        if let Some(period) = present(&self.period) {
            let period: Period = period.parse().map_err(AppError::bad_request)?;
            actions.push(Action::SelectPeriod(period));
        }

        let sectors: BTreeSet<String> = self
            .sector
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        // Sectors offered for another basket say nothing about this one
        let scope_matches = present(&self.sector_market).map_or(true, |from| {
            let selected = actions
                .iter()
                .cloned()
                .fold(ViewState::default(), |state, action| reduce(&state, action).0);
            from.eq_ignore_ascii_case(&sector_scope(&selected))
        });
        if !sectors.is_empty() && scope_matches {
            actions.push(Action::SetSectorFilter(Some(sectors)));
        }

        if let Some(sort) = present(&self.sort) {
            let sort: SortMode = sort.parse().map_err(AppError::bad_request)?;
            actions.push(Action::SetSort(sort));
        }
        if let Some(q) = present(&self.q) {
            actions.push(Action::SetSearch(q.to_string()));
        }
        if let Some(chart) = present(&self.chart) {
            let chart: ChartKind = chart.parse().map_err(AppError::bad_request)?;
            actions.push(Action::SetChartKind(chart));
        }
        if let Some(refresh) = present(&self.refresh) {
            let on = matches!(refresh.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes");
            actions.push(Action::SetAutoRefresh(on));
        }
        if let Some(symbol) = present(&self.symbol) {
            actions.push(Action::SelectSymbol(Some(symbol.to_string())));
        }

        Ok(actions)
    }
}

/// Percent-encode a query value (RFC 3986 unreserved characters pass through)
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Query string reproducing `state`, with the selected symbol replaced by
/// `symbol`. Used for treemap tile links.
pub fn state_query(state: &ViewState, symbol: Option<&str>) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("market", state.market.slug().to_string()),
        ("period", state.period.as_str().to_string()),
    ];
    if let Some(etf) = &state.etf {
        pairs.push(("etf", etf.clone()));
    }
    if let Some(sectors) = &state.sectors {
        pairs.extend(sectors.iter().map(|s| ("sector", s.clone())));
        pairs.push(("sector_market", sector_scope(state)));
    }
    pairs.push(("sort", state.sort.as_str().to_string()));
    if !state.search.is_empty() {
        pairs.push(("q", state.search.clone()));
    }
    pairs.push(("chart", state.chart.as_str().to_string()));
    if state.auto_refresh {
        pairs.push(("refresh", "1".to_string()));
    }
    if let Some(symbol) = symbol.or(state.symbol.as_deref()) {
        pairs.push(("symbol", symbol.to_string()));
    }

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmap_view::reduce;

    fn apply(query: &ViewQuery) -> ViewState {
        query
            .actions()
            .unwrap()
            .into_iter()
            .fold(ViewState::default(), |state, action| reduce(&state, action).0)
    }

    #[test]
    fn test_empty_query_is_default_state() {
        assert_eq!(apply(&ViewQuery::default()), ViewState::default());
    }

    #[test]
    fn test_full_query() {
        let query = ViewQuery {
            market: Some("etf".into()),
            etf: Some("qqq".into()),
            period: Some("1mo".into()),
            sector: vec!["Technology".into(), " ".into()],
            sector_market: Some("etf:QQQ".into()),
            sort: Some("market_cap_desc".into()),
            q: Some("nv".into()),
            symbol: Some("nvda".into()),
            chart: Some("line".into()),
            refresh: Some("on".into()),
        };
        let state = apply(&query);
        assert_eq!(state.market, Market::Etf);
        assert_eq!(state.etf.as_deref(), Some("QQQ"));
        assert_eq!(state.period, Period::OneMonth);
        assert_eq!(state.sectors.unwrap().len(), 1);
        assert_eq!(state.sort, SortMode::MarketCapDesc);
        assert_eq!(state.search, "nv");
        assert_eq!(state.symbol.as_deref(), Some("NVDA"));
        assert_eq!(state.chart, ChartKind::Line);
        assert!(state.auto_refresh);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let query = ViewQuery {
            period: Some("10y".into()),
            ..ViewQuery::default()
        };
        assert!(query.actions().is_err());

        let query = ViewQuery {
            market: Some("ftse".into()),
            ..ViewQuery::default()
        };
        assert!(query.actions().is_err());
    }

    #[test]
    fn test_sectors_from_another_market_are_dropped() {
        let dow_form = |market: &str| ViewQuery {
            market: Some(market.into()),
            sector: vec!["Financials".into(), "Technology".into()],
            sector_market: Some("dow".into()),
            ..ViewQuery::default()
        };
        assert_eq!(apply(&dow_form("dow")).sectors.map(|s| s.len()), Some(2));
        assert_eq!(apply(&dow_form("kospi")).sectors, None);
        assert_eq!(apply(&dow_form("etf")).sectors, None);

        let fund_switch = ViewQuery {
            market: Some("etf".into()),
            etf: Some("SPY".into()),
            sector: vec!["Technology".into()],
            sector_market: Some("etf:QQQ".into()),
            ..ViewQuery::default()
        };
        assert_eq!(apply(&fund_switch).sectors, None);

        // Without a scope the list applies as given
        let bare = ViewQuery {
            market: Some("kospi".into()),
            sector: vec!["Technology".into()],
            ..ViewQuery::default()
        };
        assert_eq!(apply(&bare).sectors.map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_sector_scope() {
        let (etf, _) = reduce(&ViewState::default(), Action::SelectMarket(Market::Etf));
        assert_eq!(sector_scope(&etf), "etf:SPY");
        assert_eq!(sector_scope(&ViewState::default()), ViewState::default().market.slug());
    }

    #[test]
    fn test_state_query_encodes_values() {
        let state = ViewState {
            market: Market::Sp500,
            sectors: Some(["Consumer Discretionary".to_string()].into_iter().collect()),
            search: "a&b".to_string(),
            ..ViewState::default()
        };
        let query = state_query(&state, Some("AAPL"));
        assert!(query.starts_with("market=sp500&period=1d"));
        assert!(query.contains("sector=Consumer%20Discretionary"));
        assert!(query.contains("sector_market=sp500"));
        assert!(query.contains("q=a%26b"));
        assert!(query.ends_with("symbol=AAPL"));
    }
}
