//! Domain types for the appstat state store.
//!
//! An `Application` mirrors the Kubernetes-style resource shape: object
//! metadata, a desired-state spec, and an observed status. Field names use
//! camelCase on the wire so manifests deserialize without translation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Application ───────────────────────────────────────────────────

/// A deployed application tracked by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ApplicationSpec,
    #[serde(default)]
    pub status: ApplicationStatus,
}

/// Identity and bookkeeping fields. `namespace` + `name` are unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Set once when the resource is created; never changes afterwards.
    #[serde(default)]
    pub creation_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub source: ApplicationSource,
    #[serde(default)]
    pub destination: ApplicationDestination,
}

/// Where the application's manifests come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSource {
    #[serde(rename = "repoURL", default)]
    pub repo_url: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub target_revision: String,
}

/// Cluster and namespace the application deploys into.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApplicationDestination {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApplicationStatus {
    #[serde(default)]
    pub sync: SyncInfo,
    #[serde(default)]
    pub health: HealthInfo,
}

/// Observed sync state. `status` is kept verbatim; an empty string means
/// the controller has not reported one yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncInfo {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub revision: String,
}

/// Observed health state, kept verbatim like [`SyncInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthInfo {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl Application {
    /// Build the composite key for the applications table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    /// Creation time as whole seconds since the Unix epoch.
    pub fn created_unix(&self) -> i64 {
        self.metadata.creation_timestamp.timestamp()
    }
}

// ── Status codes ──────────────────────────────────────────────────

/// Sync states the controller is known to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatusCode {
    Synced,
    OutOfSync,
    Unknown,
}

impl SyncStatusCode {
    pub const ALL: [SyncStatusCode; 3] = [Self::Synced, Self::OutOfSync, Self::Unknown];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "Synced",
            Self::OutOfSync => "OutOfSync",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SyncStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health states the controller is known to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatusCode {
    Unknown,
    Progressing,
    Healthy,
    Degraded,
    Missing,
}

impl HealthStatusCode {
    pub const ALL: [HealthStatusCode; 5] = [
        Self::Unknown,
        Self::Progressing,
        Self::Healthy,
        Self::Degraded,
        Self::Missing,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Progressing => "Progressing",
            Self::Healthy => "Healthy",
            Self::Degraded => "Degraded",
            Self::Missing => "Missing",
        }
    }
}

impl fmt::Display for HealthStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
