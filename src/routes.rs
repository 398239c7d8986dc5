use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::aggregator::{AggregateReport, Aggregator};
use crate::config::FeedSource;

pub struct AppState {
    pub aggregator: Aggregator,
    pub sources: Vec<FeedSource>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/news", get(news))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs a fresh aggregation for every request; an empty `items` list is the
/// "nothing from any source" state.
pub async fn news(State(state): State<Arc<AppState>>) -> Json<AggregateReport> {
    Json(state.aggregator.aggregate_with_report(&state.sources).await)
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
