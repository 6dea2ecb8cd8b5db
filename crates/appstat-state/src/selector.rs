//! Label selectors for filtering applications by `metadata.labels`.
//!
//! A selector is a set of required `key=value` pairs. The empty selector
//! ([`LabelSelector::everything`]) matches every application.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector with no requirements; matches everything.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Require `key` to be present with exactly `value` (builder style).
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn is_everything(&self) -> bool {
        self.match_labels.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}
