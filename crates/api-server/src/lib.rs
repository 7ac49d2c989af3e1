//! Heatmap API Server
//!
//! Serves the HTML dashboard plus the JSON and SVG endpoints behind it.

use axum::{
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use heatmap_core::{HeatmapError, MarketDataProvider};
use quote_aggregator::QuoteAggregator;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use yahoo_client::YahooClient;

pub mod config;
mod chart_routes;
mod dashboard_routes;
mod page;
mod quote_routes;
mod request_id;
mod security_headers;
mod view_query;

pub use config::AppConfig;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<QuoteAggregator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: AppConfig) -> Self {
        let aggregator = QuoteAggregator::new(provider, config.aggregator_config());
        Self {
            aggregator: Arc::new(aggregator),
            config: Arc::new(config),
        }
    }
}

/// JSON envelope for every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the status it should be reported with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!("{}", message))
    }

    pub fn not_found(message: impl std::fmt::Display) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!("{}", message))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<HeatmapError> for AppError {
    fn from(e: HeatmapError) -> Self {
        let status = match &e {
            HeatmapError::InsufficientData(_) => StatusCode::NOT_FOUND,
            HeatmapError::InvalidData(_) => StatusCode::BAD_REQUEST,
            HeatmapError::ApiError(_) => StatusCode::BAD_GATEWAY,
            HeatmapError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
            HeatmapError::RenderError(_) | HeatmapError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {:#}", self.status, self.error);
        }
        (self.status, Json(ApiResponse::error(self.error.to_string()))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/health", get(health))
        .merge(dashboard_routes::dashboard_routes())
        .merge(quote_routes::quote_routes())
        .merge(chart_routes::chart_routes())
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let client = YahooClient::new(config.yahoo_config())?;
    let bind_addr = config.bind_addr;

    tracing::info!("Yahoo base URL: {}", config.yahoo_base_url);
    tracing::info!(
        "Quote cache TTL {}s, ETF holdings limit {}, missing market cap: {:?}",
        config.quote_cache_ttl_secs,
        config.etf_holdings_limit,
        config.missing_market_cap
    );

    let state = AppState::new(Arc::new(client), config);
    let app = build_router(state);

    tracing::info!("Registering routes:");
    tracing::info!("  GET /?market=sp500&period=5d");
    tracing::info!("  GET /api/markets");
    tracing::info!("  GET /api/quotes");
    tracing::info!("  GET /api/symbols/:symbol/history");
    tracing::info!("  GET /api/symbols/:symbol/chart.svg");
    tracing::info!("  GET /health");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
