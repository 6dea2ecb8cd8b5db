//! Metric schema registry.
//!
//! The four application metric descriptors are built once at startup and
//! shared read-only for the life of the process. Samples borrow their
//! descriptor from the schema, so a sample can never outlive it.

use thiserror::Error;

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "argocd";

/// Label prefix shared by every application metric.
const APP_LABELS: [&str; 2] = ["namespace", "name"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid metric name {0:?}")]
    InvalidName(String),
}

/// Immutable description of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub fq_name: String,
    pub help: &'static str,
    pub label_names: Vec<&'static str>,
}

impl MetricDesc {
    fn new(
        prefix: &str,
        name: &str,
        help: &'static str,
        extra: &[&'static str],
    ) -> Result<Self, SchemaError> {
        let fq_name = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}_{name}")
        };
        if !is_valid_metric_name(&fq_name) {
            return Err(SchemaError::InvalidName(fq_name));
        }
        let mut label_names = APP_LABELS.to_vec();
        label_names.extend_from_slice(extra);
        Ok(Self {
            fq_name,
            help,
            label_names,
        })
    }
}

/// The registry of application metric descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSchema {
    pub app_info: MetricDesc,
    pub app_created_time: MetricDesc,
    pub app_sync_status: MetricDesc,
    pub app_health_status: MetricDesc,
}

impl MetricSchema {
    /// Build the schema with every metric name prefixed by `{prefix}_`.
    /// An empty prefix leaves the bare `app_*` names.
    pub fn new(prefix: &str) -> Result<Self, SchemaError> {
        Ok(Self {
            app_info: MetricDesc::new(
                prefix,
                "app_info",
                "Information about application.",
                &["project", "repo", "dest_server", "dest_namespace"],
            )?,
            app_created_time: MetricDesc::new(
                prefix,
                "app_created_time",
                "Creation time in unix timestamp for an application.",
                &[],
            )?,
            app_sync_status: MetricDesc::new(
                prefix,
                "app_sync_status",
                "The application current sync status.",
                &["sync_status"],
            )?,
            app_health_status: MetricDesc::new(
                prefix,
                "app_health_status",
                "The application current health status.",
                &["health_status"],
            )?,
        })
    }

    /// All descriptors, in exposition order.
    pub fn describe(&self) -> [&MetricDesc; 4] {
        [
            &self.app_info,
            &self.app_created_time,
            &self.app_sync_status,
            &self.app_health_status,
        ]
    }
}

impl Default for MetricSchema {
    fn default() -> Self {
        match Self::new(DEFAULT_PREFIX) {
            Ok(schema) => schema,
            Err(e) => unreachable!("default metric prefix is valid: {e}"),
        }
    }
}

/// One gauge value for one label set. Lives only for a single scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<'a> {
    pub desc: &'a MetricDesc,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl<'a> Sample<'a> {
    /// Build a sample.
    ///
    /// # Panics
    ///
    /// If the number of label values differs from the descriptor's label
    /// names. That can only come from a coding error, never from input data.
    pub fn new(desc: &'a MetricDesc, label_values: Vec<String>, value: f64) -> Self {
        assert_eq!(
            label_values.len(),
            desc.label_names.len(),
            "metric {} expects labels {:?}, got values {:?}",
            desc.fq_name,
            desc.label_names,
            label_values,
        );
        Self {
            desc,
            label_values,
            value,
        }
    }

    /// Value of the label called `name`, if the descriptor has it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names
            .iter()
            .position(|n| *n == name)
            .map(|i| self.label_values[i].as_str())
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
