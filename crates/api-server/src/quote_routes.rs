//! Quote API Routes
//!
//! Market catalog and the aggregated quote table as JSON.

use axum::{extract::State, routing::get, Json, Router};
use axum_extra::extract::Query;
use chrono::{DateTime, Utc};
use heatmap_core::{Period, QuoteRow, SortMode};
use heatmap_view::{apply_view, reduce, resolve_symbols, sectors_present, ViewState};
use quote_aggregator::BatchReport;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use symbol_catalog::MarketListing;

use crate::view_query::ViewQuery;
use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub markets: Vec<MarketListing>,
    pub etfs: &'static [&'static str],
    pub periods: Vec<&'static str>,
    pub sorts: Vec<SortOption>,
}

#[derive(Serialize)]
pub struct QuoteTableView {
    pub period: Period,
    pub rows: Vec<QuoteRow>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct QuotesResponse {
    pub state: ViewState,
    pub symbols_requested: Vec<String>,
    pub sectors: BTreeSet<String>,
    pub table: QuoteTableView,
    pub report: BatchReport,
    /// Skip counts keyed by reason
    pub skipped_by_kind: BTreeMap<&'static str, usize>,
    pub cache_hit: bool,
}

pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/api/markets", get(get_markets))
        .route("/api/quotes", get(get_quotes))
}

async fn get_markets() -> Json<ApiResponse<CatalogResponse>> {
    Json(ApiResponse::success(CatalogResponse {
        markets: MarketListing::all(),
        etfs: symbol_catalog::etf_choices(),
        periods: Period::selectable().iter().map(|p| p.as_str()).collect(),
        sorts: SortMode::all()
            .iter()
            .map(|s| SortOption {
                value: s.as_str(),
                label: s.label(),
            })
            .collect(),
    }))
}

/// Quote table after filter, search and sort. Skips the detail chart.
async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<ApiResponse<QuotesResponse>>, AppError> {
    let view_state = query
        .actions()?
        .into_iter()
        .fold(ViewState::default(), |s, action| reduce(&s, action).0);

    let symbols = resolve_symbols(&state.aggregator, &view_state).await;
    let outcome = state.aggregator.load_quotes(&symbols, view_state.period).await;
    let rows = apply_view(&outcome.table, &view_state);

    Ok(Json(ApiResponse::success(QuotesResponse {
        sectors: sectors_present(&outcome.table.rows),
        table: QuoteTableView {
            period: outcome.table.period,
            rows,
            fetched_at: outcome.table.fetched_at,
        },
        skipped_by_kind: outcome.report.skipped_by_kind(),
        report: outcome.report.as_ref().clone(),
        cache_hit: outcome.cache_hit,
        symbols_requested: symbols,
        state: view_state,
    })))
}

#[cfg(test)]
mod tests {
    use crate::build_router;
    use crate::tests::{dow_provider, get, test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_markets_catalog() {
        let app = build_router(test_state(dow_provider()));
        let (status, _, body) = get(app, "/api/markets").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["markets"].as_array().unwrap().len(), 6);
        assert_eq!(json["data"]["markets"][0]["name"], "KOSPI");
        assert_eq!(json["data"]["periods"], serde_json::json!(["1d", "5d", "1mo"]));
        assert_eq!(json["data"]["etfs"][0], "SPY");
    }

    #[tokio::test]
    async fn test_quotes_sorted_and_cached() {
        let app = build_router(test_state(dow_provider()));

        let (status, _, body) = get(app.clone(), "/api/quotes?market=dow&period=5d&sort=change_asc").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let data = &json["data"];
        assert_eq!(data["table"]["rows"][0]["Symbol"], "JPM");
        assert_eq!(data["table"]["rows"][1]["Symbol"], "AAPL");
        assert_eq!(data["table"]["rows"][1]["Change (%)"], 6.67);
        assert_eq!(data["table"]["rows"][1]["Price"], 160.0);
        assert_eq!(data["report"]["loaded"], 2);
        assert_eq!(data["skipped_by_kind"]["insufficient_history"], 1);
        assert_eq!(data["cache_hit"], false);

        let (_, _, body) = get(app, "/api/quotes?market=dow&period=5d").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["cache_hit"], true);
        assert_eq!(json["data"]["table"]["rows"][0]["Symbol"], "AAPL");
    }

    #[tokio::test]
    async fn test_quotes_search() {
        let app = build_router(test_state(dow_provider()));
        let (_, _, body) = get(app, "/api/quotes?market=dow&period=5d&q=jp").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let rows = json["data"]["table"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Symbol"], "JPM");
    }
}
