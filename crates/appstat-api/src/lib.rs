//! appstat-api — HTTP surface of the exporter.
//!
//! Binds the scrape path to a handler that runs one fresh collection per
//! request. Concurrent scrapes share nothing but the immutable schema and
//! the store handle.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` (configurable) | Prometheus exposition of application metrics |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use appstat_metrics::MetricSchema;
use appstat_state::ApplicationLister;

/// Default scrape path.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Shared state for the scrape handler.
#[derive(Clone)]
pub struct ExporterState {
    pub schema: Arc<MetricSchema>,
    pub store: Arc<dyn ApplicationLister>,
}

impl ExporterState {
    pub fn new(schema: Arc<MetricSchema>, store: Arc<dyn ApplicationLister>) -> Self {
        Self { schema, store }
    }
}

/// Build the exporter router.
///
/// `metrics_path` must be a plain path; axum panics on malformed route
/// syntax and turns `{name}` segments into captures.
pub fn build_router(metrics_path: &str, state: ExporterState) -> Router {
    Router::new()
        .route(metrics_path, get(handlers::scrape))
        .with_state(state)
}
