//! Scrape handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tracing::debug;

use appstat_metrics::{encode_text, gather, AppCollector, TEXT_CONTENT_TYPE};

use crate::ExporterState;

/// GET /metrics
///
/// Always answers 200. A store failure shows up as families with no samples.
pub async fn scrape(State(state): State<ExporterState>) -> impl IntoResponse {
    let collector = AppCollector::new(state.schema.clone(), state.store.clone());
    let body = encode_text(&gather(&collector));
    debug!(bytes = body.len(), "scrape served");

    (StatusCode::OK, [(CONTENT_TYPE, TEXT_CONTENT_TYPE)], body)
}
