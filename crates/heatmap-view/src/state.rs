//! Dashboard selections and the reducer that applies user actions to them

use heatmap_core::{Market, Period, SortMode};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::chart::ChartKind;

/// Everything the user has selected. Replaced wholesale by [`reduce`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub market: Market,
    pub period: Period,
    /// Fund whose holdings are shown; only meaningful for [`Market::Etf`]
    pub etf: Option<String>,
    /// Allowed sectors; `None` shows every sector
    pub sectors: Option<BTreeSet<String>>,
    pub sort: SortMode,
    pub search: String,
    pub symbol: Option<String>,
    pub chart: ChartKind,
    pub auto_refresh: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            market: Market::default(),
            period: Period::default(),
            etf: None,
            sectors: None,
            sort: SortMode::default(),
            search: String::new(),
            symbol: None,
            chart: ChartKind::default(),
            auto_refresh: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectMarket(Market),
    SelectPeriod(Period),
    SelectEtf(String),
    SetSectorFilter(Option<BTreeSet<String>>),
    SetSort(SortMode),
    SetSearch(String),
    SelectSymbol(Option<String>),
    SetChartKind(ChartKind),
    SetAutoRefresh(bool),
}

/// Earliest pipeline stage an action invalidates. Later stages are implied,
/// so `Quotes < View < Detail < None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Symbol list and quote table
    Quotes,
    /// Filter, search, sort and treemap
    View,
    /// Detail chart for the selected symbol
    Detail,
    None,
}

impl Stage {
    /// The earlier of two stages
    pub fn merge(self, other: Stage) -> Stage {
        self.min(other)
    }
}

fn default_etf(market: Market) -> Option<String> {
    if market == Market::Etf {
        symbol_catalog::etf_choices().first().map(|s| s.to_string())
    } else {
        None
    }
}

/// Apply `action` to `state`.
///
/// Returns the next state and the earliest stage that has to be recomputed.
/// Actions that change nothing return [`Stage::None`].
pub fn reduce(state: &ViewState, action: Action) -> (ViewState, Stage) {
    let mut next = state.clone();

    let stage = match action {
        Action::SelectMarket(market) => {
            if market == state.market {
                return (next, Stage::None);
            }
            next.market = market;
            next.etf = default_etf(market);
            next.sectors = None;
            next.symbol = None;
            Stage::Quotes
        }
        Action::SelectPeriod(period) => {
            if period == state.period {
                return (next, Stage::None);
            }
            next.period = period;
            Stage::Quotes
        }
        Action::SelectEtf(etf) => {
            let etf = etf.trim().to_uppercase();
            if state.market != Market::Etf
                || !symbol_catalog::is_etf_choice(&etf)
                || state.etf.as_deref() == Some(etf.as_str())
            {
                return (next, Stage::None);
            }
            next.etf = Some(etf);
            next.sectors = None;
            next.symbol = None;
            Stage::Quotes
        }
        Action::SetSectorFilter(sectors) => {
            if sectors == state.sectors {
                return (next, Stage::None);
            }
            next.sectors = sectors;
            Stage::View
        }
        Action::SetSort(sort) => {
            if sort == state.sort {
                return (next, Stage::None);
            }
            next.sort = sort;
            Stage::View
        }
        Action::SetSearch(search) => {
            let search = search.trim().to_string();
            if search == state.search {
                return (next, Stage::None);
            }
            next.search = search;
            Stage::View
        }
        Action::SelectSymbol(symbol) => {
            let symbol = symbol
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty());
            if symbol == state.symbol {
                return (next, Stage::None);
            }
            next.symbol = symbol;
            Stage::Detail
        }
        Action::SetChartKind(kind) => {
            if kind == state.chart {
                return (next, Stage::None);
            }
            next.chart = kind;
            Stage::Detail
        }
        Action::SetAutoRefresh(on) => {
            // Only affects the page refresh header
            next.auto_refresh = on;
            Stage::None
        }
    };

    (next, stage)
}
