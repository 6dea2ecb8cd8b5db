//! Application collector — one instance per scrape.
//!
//! Lists every application from the store in a single call and maps each
//! one to its samples. A listing failure degrades the scrape to zero
//! samples and a warning log; it never surfaces as an error.

use std::sync::Arc;

use tracing::{debug, warn};

use appstat_state::{ApplicationLister, LabelSelector};

use crate::mapper::map_application;
use crate::schema::{MetricDesc, MetricSchema, Sample};

/// Collects application samples against a shared schema and store.
pub struct AppCollector {
    schema: Arc<MetricSchema>,
    store: Arc<dyn ApplicationLister>,
}

impl AppCollector {
    pub fn new(schema: Arc<MetricSchema>, store: Arc<dyn ApplicationLister>) -> Self {
        Self { schema, store }
    }

    /// The descriptors this collector can produce, independent of data.
    pub fn describe(&self) -> [&MetricDesc; 4] {
        self.schema.describe()
    }

    /// Produce every sample for the current store snapshot.
    ///
    /// Returns an empty set if the store cannot be listed.
    pub fn collect(&self) -> Vec<Sample<'_>> {
        let apps = match self.store.list(&LabelSelector::everything()) {
            Ok(apps) => apps,
            Err(e) => {
                warn!(error = %e, "failed to collect applications");
                return Vec::new();
            }
        };

        let samples: Vec<Sample<'_>> = apps
            .iter()
            .flat_map(|app| map_application(&self.schema, app))
            .collect();
        debug!(applications = apps.len(), samples = samples.len(), "applications collected");
        samples
    }
}
