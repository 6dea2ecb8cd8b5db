//! Manifest resync — keeps the application store in step with a directory.
//!
//! Every interval the directory is walked, each `*.json` file is parsed as
//! one `Application` or an array of them, and the store's contents are
//! atomically replaced with the result. Scrapes read the store
//! concurrently and always see either the previous set or the new one.
//!
//! A pass that had to skip an unreadable file only upserts: the set it
//! loaded is incomplete, so nothing is removed until a clean pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use appstat_state::{Application, StateStore};

#[derive(Deserialize)]
#[serde(untagged)]
enum Manifest {
    One(Box<Application>),
    Many(Vec<Application>),
}

/// Outcome of one resync pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub files: usize,
    pub skipped: usize,
    pub upserted: usize,
    pub removed: usize,
}

pub struct ManifestSync {
    dir: PathBuf,
    store: StateStore,
    interval: Duration,
}

impl ManifestSync {
    pub fn new(dir: PathBuf, store: StateStore, interval: Duration) -> Self {
        Self {
            dir,
            store,
            interval,
        }
    }

    /// Load every manifest and replace the store contents.
    ///
    /// Unparseable files are skipped with a warning, and then stored
    /// applications missing from the loaded set are kept. If the directory
    /// itself cannot be walked the store is left untouched.
    pub fn resync_once(&self) -> anyhow::Result<SyncReport> {
        let (apps, mut report) = load_manifests(&self.dir)?;
        let (upserted, removed) = if report.skipped > 0 {
            warn!(
                skipped = report.skipped,
                "manifests skipped, keeping previously stored applications"
            );
            (self.store.upsert_all(&apps)?, 0)
        } else {
            self.store.replace_all(&apps)?
        };
        report.upserted = upserted;
        report.removed = removed;
        debug!(
            files = report.files,
            skipped = report.skipped,
            upserted,
            removed,
            "manifests resynced"
        );
        Ok(report)
    }

    /// Resync on every tick until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            dir = %self.dir.display(),
            interval_secs = self.interval.as_secs(),
            "manifest resync started"
        );

        loop {
            if let Err(e) = self.resync_once() {
                warn!(error = %e, "manifest resync failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("manifest resync shutting down");
                    break;
                }
            }
        }
    }
}

/// Parse all `*.json` manifests under `dir`, in file-name order.
///
/// When two manifests declare the same `{namespace}/{name}` the later file
/// wins.
pub fn load_manifests(dir: &Path) -> anyhow::Result<(Vec<Application>, SyncReport)> {
    let mut report = SyncReport::default();
    let mut apps: BTreeMap<String, Application> = BTreeMap::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        report.files += 1;

        let parsed = std::fs::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<Manifest>(&bytes)?));
        let manifest = match parsed {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable manifest");
                report.skipped += 1;
                continue;
            }
        };

        let batch = match manifest {
            Manifest::One(app) => vec![*app],
            Manifest::Many(list) => list,
        };
        for app in batch {
            let key = app.table_key();
            if apps.insert(key.clone(), app).is_some() {
                warn!(%key, path = %path.display(), "duplicate application, later manifest wins");
            }
        }
    }

    Ok((apps.into_values().collect(), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use appstat_state::{ApplicationLister, LabelSelector};

    fn manifest(ns: &str, name: &str, sync: &str) -> String {
        format!(
            r#"{{"metadata": {{"namespace": "{ns}", "name": "{name}",
                "creationTimestamp": "2020-09-13T12:26:40Z"}},
              "spec": {{"project": "default"}},
              "status": {{"sync": {{"status": "{sync}"}}}}}}"#
        )
    }

    #[test]
    fn loads_single_and_array_manifests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), manifest("ns", "a", "Synced")).unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            format!("[{}, {}]", manifest("ns", "b", ""), manifest("other", "c", "OutOfSync")),
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "not a manifest").unwrap();

        let (apps, report) = load_manifests(dir.path()).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.skipped, 0);
        let keys: Vec<_> = apps.iter().map(Application::table_key).collect();
        assert_eq!(keys, ["ns/a", "ns/b", "other/c"]);
    }

    #[test]
    fn bad_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.json"), manifest("ns", "ok", "Synced")).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();

        let (apps, report) = load_manifests(dir.path()).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(report.files, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn later_file_wins_on_duplicate_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.json"), manifest("ns", "a", "Synced")).unwrap();
        std::fs::write(dir.path().join("2.json"), manifest("ns", "a", "OutOfSync")).unwrap();

        let (apps, _) = load_manifests(dir.path()).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].status.sync.status, "OutOfSync");
    }

    #[test]
    fn resync_replaces_store_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open_in_memory().unwrap();
        let sync = ManifestSync::new(
            dir.path().to_path_buf(),
            store.clone(),
            Duration::from_secs(1),
        );

        std::fs::write(dir.path().join("a.json"), manifest("ns", "a", "Synced")).unwrap();
        std::fs::write(dir.path().join("b.json"), manifest("ns", "b", "Synced")).unwrap();
        let report = sync.resync_once().unwrap();
        assert_eq!((report.upserted, report.removed), (2, 0));

        std::fs::remove_file(dir.path().join("b.json")).unwrap();
        let report = sync.resync_once().unwrap();
        assert_eq!((report.upserted, report.removed), (1, 1));

        let names: Vec<_> = store
            .list(&LabelSelector::everything())
            .unwrap()
            .into_iter()
            .map(|a| a.metadata.name)
            .collect();
        assert_eq!(names, ["a"]);
    }

    #[test]
    fn corrupt_manifest_keeps_its_applications() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open_in_memory().unwrap();
        let sync = ManifestSync::new(
            dir.path().to_path_buf(),
            store.clone(),
            Duration::from_secs(1),
        );

        std::fs::write(dir.path().join("a.json"), manifest("ns", "a", "Synced")).unwrap();
        std::fs::write(dir.path().join("b.json"), manifest("ns", "b", "Synced")).unwrap();
        sync.resync_once().unwrap();

        // Half-written file on the next pass.
        std::fs::write(dir.path().join("a.json"), r#"{"metadata":{"names"#).unwrap();
        std::fs::write(dir.path().join("b.json"), manifest("ns", "b", "OutOfSync")).unwrap();
        let report = sync.resync_once().unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!((report.upserted, report.removed), (1, 0));

        let a = store.get_application("ns/a").unwrap().unwrap();
        assert_eq!(a.status.sync.status, "Synced");
        let b = store.get_application("ns/b").unwrap().unwrap();
        assert_eq!(b.status.sync.status, "OutOfSync");

        // Once the directory is clean again, removals resume.
        std::fs::remove_file(dir.path().join("a.json")).unwrap();
        let report = sync.resync_once().unwrap();
        assert_eq!((report.skipped, report.removed), (0, 1));
        assert!(store.get_application("ns/a").unwrap().is_none());
    }

    #[test]
    fn missing_dir_leaves_store_untouched() {
        let store = StateStore::open_in_memory().unwrap();
        let mut app = Application::default();
        app.metadata.namespace = "ns".to_string();
        app.metadata.name = "kept".to_string();
        store.put_application(&app).unwrap();

        let sync = ManifestSync::new(
            PathBuf::from("/nonexistent/appstat-manifests"),
            store.clone(),
            Duration::from_secs(1),
        );
        assert!(sync.resync_once().is_err());
        assert!(store.get_application("ns/kept").unwrap().is_some());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), manifest("ns", "a", "Synced")).unwrap();
        let store = StateStore::open_in_memory().unwrap();
        let sync = ManifestSync::new(
            dir.path().to_path_buf(),
            store.clone(),
            Duration::from_secs(3600),
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { sync.run(rx).await });

        // First pass runs immediately.
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.get_application("ns/a").unwrap().is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
