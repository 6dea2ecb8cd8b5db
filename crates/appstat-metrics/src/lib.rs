//! appstat-metrics — scrape-time metrics for applications.
//!
//! Every scrape lists the current applications from an
//! [`ApplicationLister`](appstat_state::ApplicationLister), maps each one to
//! a fixed set of gauge samples, and renders them in the Prometheus text
//! exposition format. Nothing is cached between scrapes.
//!
//! # Architecture
//!
//! ```text
//! MetricSchema (built once, shared via Arc)
//!   └── describe() → the four metric descriptors
//!
//! AppCollector
//!   ├── describe() ← schema
//!   └── collect() → lister.list() → map_application() per item
//!
//! Prometheus exposition
//!   ├── gather()      → describe + collect, grouped into families
//!   └── encode_text() → text/plain for the /metrics endpoint
//! ```

pub mod collector;
pub mod mapper;
pub mod prometheus;
pub mod schema;

pub use collector::AppCollector;
pub use mapper::map_application;
pub use prometheus::{encode_text, gather, MetricFamily, TEXT_CONTENT_TYPE};
pub use schema::{MetricDesc, MetricSchema, Sample, SchemaError, DEFAULT_PREFIX};
