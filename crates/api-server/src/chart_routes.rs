//! Symbol chart routes
//!
//! Three-month history for one symbol, as JSON bars or a rendered SVG.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use heatmap_core::{Bar, HeatmapError, Period};
use heatmap_view::{render_detail_chart, ChartKind, DEFAULT_CHART_SIZE};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct ChartQuery {
    pub kind: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub period: Period,
    pub bars: Vec<Bar>,
}

pub fn chart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/symbols/:symbol/history", get(get_history))
        .route("/api/symbols/:symbol/chart.svg", get(get_chart_svg))
}

/// Uppercased ticker, or 400 for anything that cannot be one
fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= 20
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(symbol)
    } else {
        Err(AppError::bad_request(format!("Invalid symbol: {}", raw)))
    }
}

async fn fetch_history(state: &AppState, symbol: &str) -> Result<Vec<Bar>, AppError> {
    let bars = state
        .aggregator
        .provider()
        .history(symbol, Period::ThreeMonths)
        .await?;
    if bars.is_empty() {
        return Err(HeatmapError::InsufficientData(format!("No history for {}", symbol)).into());
    }
    Ok(bars)
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<HistoryResponse>>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let bars = fetch_history(&state, &symbol).await?;

    Ok(Json(ApiResponse::success(HistoryResponse {
        symbol,
        period: Period::ThreeMonths,
        bars,
    })))
}

async fn get_chart_svg(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let kind: ChartKind = match query.kind.as_deref() {
        Some(kind) => kind.parse()?,
        None => ChartKind::default(),
    };
    let size = (
        query.width.unwrap_or(DEFAULT_CHART_SIZE.0).clamp(320, 2400),
        query.height.unwrap_or(DEFAULT_CHART_SIZE.1).clamp(200, 1600),
    );

    let bars = fetch_history(&state, &symbol).await?;
    let svg = render_detail_chart(&symbol, &bars, kind, size)?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
