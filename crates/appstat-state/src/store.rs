//! StateStore — redb-backed application store.
//!
//! Holds the current set of `Application` resources. Values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, Table};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::lister::ApplicationLister;
use crate::selector::LabelSelector;
use crate::tables::APPLICATIONS;
use crate::types::Application;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe application store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert or update an application.
    pub fn put_application(&self, app: &Application) -> StateResult<()> {
        let key = app.table_key();
        let value = serde_json::to_vec(app).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "application stored");
        Ok(())
    }

    /// Get an application by its `{namespace}/{name}` key.
    pub fn get_application(&self, key: &str) -> StateResult<Option<Application>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let app: Application =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(app))
            }
            None => Ok(None),
        }
    }

    /// List applications matching `selector`, read in one transaction.
    pub fn list_applications(&self, selector: &LabelSelector) -> StateResult<Vec<Application>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let app: Application =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if selector.matches(&app.metadata.labels) {
                results.push(app);
            }
        }
        Ok(results)
    }

    /// Atomically replace the whole application set.
    ///
    /// Keys absent from `apps` are removed; the rest are upserted. Readers
    /// see either the old set or the new one, never a mix.
    /// Returns `(upserted, removed)`.
    pub fn replace_all(&self, apps: &[Application]) -> StateResult<(usize, usize)> {
        let incoming: HashSet<String> = apps.iter().map(Application::table_key).collect();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removed;
        {
            let mut table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;

            let mut stale = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let key = key.value().to_string();
                if !incoming.contains(&key) {
                    stale.push(key);
                }
            }
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            removed = stale.len();

            insert_all(&mut table, apps)?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(upserted = apps.len(), removed, "application set replaced");
        Ok((apps.len(), removed))
    }

    /// Upsert `apps` in one write transaction without removing anything.
    ///
    /// Used when the incoming set is known to be incomplete. Returns the
    /// number of applications written.
    pub fn upsert_all(&self, apps: &[Application]) -> StateResult<usize> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(APPLICATIONS).map_err(map_err!(Table))?;
            insert_all(&mut table, apps)?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(upserted = apps.len(), "applications upserted");
        Ok(apps.len())
    }
}

fn insert_all(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    apps: &[Application],
) -> StateResult<()> {
    for app in apps {
        let key = app.table_key();
        let value = serde_json::to_vec(app).map_err(map_err!(Serialize))?;
        table
            .insert(key.as_str(), value.as_slice())
            .map_err(map_err!(Write))?;
    }
    Ok(())
}

impl ApplicationLister for StateStore {
    fn list(&self, selector: &LabelSelector) -> StateResult<Vec<Application>> {
        self.list_applications(selector)
    }
}
