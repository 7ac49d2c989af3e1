//! One user's dashboard: selections plus the cached output of each stage

use chrono::{DateTime, Utc};
use heatmap_core::{Bar, Market, Period, QuoteRow};
use quote_aggregator::{BatchReport, LoadOutcome, QuoteAggregator};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::chart::{render_detail_chart, ChartKind, DEFAULT_CHART_SIZE};
use crate::state::{reduce, Action, Stage, ViewState};
use crate::table::{apply_view, sectors_present};
use crate::treemap::Treemap;

/// Treemap canvas in CSS pixels
pub const TREEMAP_SIZE: (f64, f64) = (1200.0, 640.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// Nothing could be loaded for the current selection
    NoData,
    /// Data loaded, but the filter or search hides every row
    NoMatches,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::NoData => "Could not load data. Please try again later.",
            Notice::NoMatches => "No symbols match the current filter.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetailView {
    pub symbol: String,
    pub kind: ChartKind,
    pub bars: Vec<Bar>,
    /// `None` when there was no history to draw
    pub svg: Option<String>,
}

/// Everything the page needs for one render
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub state: ViewState,
    pub symbols_requested: Vec<String>,
    /// Filtered, searched and sorted rows
    pub rows: Vec<QuoteRow>,
    /// Sectors in the unfiltered table
    pub sectors: BTreeSet<String>,
    pub treemap: Option<Treemap>,
    pub report: Arc<BatchReport>,
    pub cache_hit: bool,
    pub fetched_at: DateTime<Utc>,
    pub detail: Option<DetailView>,
    pub notice: Option<Notice>,
}

/// Tickers to load for the current selection: the market basket, or the
/// chosen fund's top holdings for [`Market::Etf`].
pub async fn resolve_symbols(aggregator: &QuoteAggregator, state: &ViewState) -> Vec<String> {
    match state.market {
        Market::Etf => match state.etf.as_deref() {
            Some(etf) => aggregator.resolve_holdings(etf).await,
            None => Vec::new(),
        },
        market => symbol_catalog::symbols_for(market)
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

pub struct Session {
    aggregator: Arc<QuoteAggregator>,
    state: ViewState,
    dirty: Stage,
    symbols: Vec<String>,
    outcome: Option<LoadOutcome>,
    rows: Vec<QuoteRow>,
    detail: Option<DetailView>,
    canvas: (f64, f64),
}

impl Session {
    pub fn new(aggregator: Arc<QuoteAggregator>) -> Self {
        Self::with_state(aggregator, ViewState::default())
    }

    pub fn with_state(aggregator: Arc<QuoteAggregator>, state: ViewState) -> Self {
        Self {
            aggregator,
            state,
            dirty: Stage::Quotes,
            symbols: Vec::new(),
            outcome: None,
            rows: Vec::new(),
            detail: None,
            canvas: TREEMAP_SIZE,
        }
    }

    pub fn with_canvas(mut self, width: f64, height: f64) -> Self {
        self.canvas = (width, height);
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Apply a user action; the affected stages are recomputed on the next
    /// [`render`](Self::render).
    pub fn dispatch(&mut self, action: Action) -> Stage {
        let (next, stage) = reduce(&self.state, action);
        self.state = next;
        self.dirty = self.dirty.merge(stage);
        stage
    }

    /// Three months of history for the selected symbol, or the first visible
    /// row when nothing (or something no longer shown) is selected.
    async fn load_detail(&self) -> Option<DetailView> {
        let symbol = match &self.state.symbol {
            Some(s) if self.rows.iter().any(|r| &r.symbol == s) => s.clone(),
            _ => self.rows.first()?.symbol.clone(),
        };

        let bars = match self.aggregator.provider().history(&symbol, Period::ThreeMonths).await {
            Ok(bars) => bars,
            Err(e) => {
                tracing::debug!("Detail history for {} failed: {}", symbol, e);
                Vec::new()
            }
        };

        let svg = if bars.is_empty() {
            None
        } else {
            match render_detail_chart(&symbol, &bars, self.state.chart, DEFAULT_CHART_SIZE) {
                Ok(svg) => Some(svg),
                Err(e) => {
                    tracing::warn!("Failed to render chart for {}: {}", symbol, e);
                    None
                }
            }
        };

        Some(DetailView {
            symbol,
            kind: self.state.chart,
            bars,
            svg,
        })
    }

    /// Recompute the dirty stages and assemble the page model.
    pub async fn render(&mut self) -> DashboardView {
        let outcome = match self.outcome.clone() {
            Some(outcome) if self.dirty > Stage::Quotes => outcome,
            _ => {
                self.symbols = resolve_symbols(&self.aggregator, &self.state).await;
                let outcome = self.aggregator.load_quotes(&self.symbols, self.state.period).await;
                self.outcome = Some(outcome.clone());
                outcome
            }
        };

        if self.dirty <= Stage::View {
            self.rows = apply_view(&outcome.table, &self.state);
        }

        let notice = if outcome.table.is_empty() {
            Some(Notice::NoData)
        } else if self.rows.is_empty() {
            Some(Notice::NoMatches)
        } else {
            None
        };

        if notice.is_some() {
            self.detail = None;
        } else if self.dirty <= Stage::Detail {
            self.detail = self.load_detail().await;
        }
        self.dirty = Stage::None;

        let treemap = if notice.is_none() {
            Treemap::layout(&self.rows, self.canvas.0, self.canvas.1)
        } else {
            None
        };

        DashboardView {
            state: self.state.clone(),
            symbols_requested: self.symbols.clone(),
            rows: self.rows.clone(),
            sectors: sectors_present(&outcome.table.rows),
            treemap,
            report: outcome.report.clone(),
            cache_hit: outcome.cache_hit,
            fetched_at: outcome.table.fetched_at,
            detail: self.detail.clone(),
            notice,
        }
    }
}
