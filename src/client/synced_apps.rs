// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store of partner apps linked on this device, persisted as a JSON file.

use crate::models::SyncedApp;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("synced app file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("synced app file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Keyed by `app_id`; inserting an existing ID replaces it.
#[derive(Debug, Clone, Default)]
pub struct SyncedAppStore {
    apps: Arc<DashMap<String, SyncedApp>>,
}

impl SyncedAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store saved with [`SyncedAppStore::save`]. A missing file
    /// yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self::new();
        match std::fs::read(path.as_ref()) {
            Ok(bytes) => {
                let apps: Vec<SyncedApp> = serde_json::from_slice(&bytes)?;
                store.insert_many(apps);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(path = %path.as_ref().display(), apps = store.count(), "Loaded synced apps");
        Ok(store)
    }

    /// Write every app to `path`, replacing the file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(&self.all())?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Insert or replace. Returns the previous record, if any.
    pub fn insert(&self, app: SyncedApp) -> Option<SyncedApp> {
        self.apps.insert(app.app_id.clone(), app)
    }

    pub fn insert_many(&self, apps: impl IntoIterator<Item = SyncedApp>) {
        for app in apps {
            self.insert(app);
        }
    }

    /// All apps, most recently synced first.
    pub fn all(&self) -> Vec<SyncedApp> {
        let mut apps: Vec<SyncedApp> = self.apps.iter().map(|e| e.value().clone()).collect();
        apps.sort_by(|a, b| {
            b.synced_at
                .cmp(&a.synced_at)
                .then_with(|| a.app_id.cmp(&b.app_id))
        });
        apps
    }

    pub fn get(&self, app_id: &str) -> Option<SyncedApp> {
        self.apps.get(app_id).map(|e| e.value().clone())
    }

    pub fn is_synced(&self, app_id: &str) -> bool {
        self.apps.contains_key(app_id)
    }

    pub fn remove(&self, app_id: &str) -> Option<SyncedApp> {
        self.apps.remove(app_id).map(|(_, app)| app)
    }

    pub fn clear(&self) {
        self.apps.clear();
    }

    pub fn count(&self) -> usize {
        self.apps.len()
    }

    /// App names, used as brand names when syncing private coupons.
    pub fn app_names(&self) -> Vec<String> {
        self.all().into_iter().map(|app| app.app_name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, name: &str, synced_at: i64) -> SyncedApp {
        SyncedApp {
            app_id: id.into(),
            app_name: name.into(),
            synced_at,
        }
    }

    #[test]
    fn test_insert_replaces() {
        let store = SyncedAppStore::new();
        assert!(store.insert(app("com.zomato", "Zomato", 1)).is_none());
        let previous = store.insert(app("com.zomato", "Zomato", 5)).unwrap();
        assert_eq!(previous.synced_at, 1);
        assert_eq!(store.count(), 1);
        assert_eq!(store.get("com.zomato").unwrap().synced_at, 5);
    }

    #[test]
    fn test_all_ordered_newest_first() {
        let store = SyncedAppStore::new();
        store.insert_many([
            app("a", "Swiggy", 10),
            app("b", "Zomato", 30),
            app("c", "Myntra", 20),
        ]);
        let ids: Vec<String> = store.all().into_iter().map(|a| a.app_id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(store.app_names(), vec!["Zomato", "Myntra", "Swiggy"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synced_apps.json");

        let empty = SyncedAppStore::load(&path).unwrap();
        assert_eq!(empty.count(), 0);

        let store = SyncedAppStore::new();
        store.insert_many([app("com.zomato", "Zomato", 30), app("com.swiggy", "Swiggy", 10)]);
        store.save(&path).unwrap();

        let reloaded = SyncedAppStore::load(&path).unwrap();
        assert_eq!(reloaded.all(), store.all());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synced_apps.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            SyncedAppStore::load(&path),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = SyncedAppStore::new();
        store.insert_many([app("a", "A", 1), app("b", "B", 2)]);

        assert!(store.is_synced("a"));
        assert_eq!(store.remove("a").unwrap().app_name, "A");
        assert!(!store.is_synced("a"));
        assert!(store.remove("a").is_none());

        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.all().is_empty());
    }
}
