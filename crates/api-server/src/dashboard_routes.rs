//! HTML dashboard

use axum::{extract::State, response::Html, routing::get, Extension, Router};
use axum_extra::extract::Query;
use heatmap_view::Session;

use crate::page::render_page;
use crate::request_id::RequestId;
use crate::view_query::ViewQuery;
use crate::{AppError, AppState};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Each request replays its query string onto a fresh session. Quote reuse
/// across requests comes from the aggregator's cache.
async fn dashboard(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<ViewQuery>,
) -> Result<Html<String>, AppError> {
    let mut session = Session::new(state.aggregator.clone());
    for action in query.actions()? {
        session.dispatch(action);
    }

    let view = session.render().await;
    tracing::debug!(
        request_id = %request_id.0,
        "Dashboard {} {}: {} rows, cache_hit={}",
        view.state.market,
        view.state.period,
        view.rows.len(),
        view.cache_hit
    );

    Ok(Html(render_page(&view, state.config.auto_refresh_secs)))
}
