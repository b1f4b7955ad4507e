use crate::loader::{self, LoadError, RecordSource};
use crate::records::RecordStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifies one load of one source
///
/// Bumping `version` makes the next lookup miss and reload the source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub version: u64,
}

impl CacheKey {
    pub fn new(source: &RecordSource, version: u64) -> Self {
        CacheKey {
            source: source.to_string(),
            version,
        }
    }
}

#[derive(Default)]
struct Entries {
    stores: HashMap<CacheKey, Arc<RecordStore>>,
    /// Lowest version still accepted per source
    floors: HashMap<String, u64>,
}

/// Memoized record stores, shared read-only between requests
///
/// Only the newest version of a source is kept. Once a version is retired,
/// a load of it that finishes late is handed back to its caller but not
/// cached.
#[derive(Default)]
pub struct RecordCache {
    entries: Mutex<Entries>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<RecordStore>> {
        self.entries.lock().ok()?.stores.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, store: RecordStore) -> Arc<RecordStore> {
        let store = Arc::new(store);
        let Ok(mut entries) = self.entries.lock() else {
            return store;
        };

        let floor = entries.floors.get(&key.source).copied().unwrap_or(0);
        let newer_cached = entries
            .stores
            .keys()
            .any(|k| k.source == key.source && k.version > key.version);
        if key.version < floor || newer_cached {
            log::debug!("not caching stale version {} of {}", key.version, key.source);
            return store;
        }

        entries
            .stores
            .retain(|k, _| k.source != key.source || k.version >= key.version);
        entries.stores.insert(key, Arc::clone(&store));
        store
    }

    /// Returns the cached store for `key`, loading `source` on a miss
    ///
    /// A failed load is returned to the caller and nothing is cached, so
    /// the next call tries again.
    pub async fn get_or_load(
        &self,
        key: CacheKey,
        source: &RecordSource,
    ) -> Result<Arc<RecordStore>, LoadError> {
        if let Some(store) = self.get(&key) {
            return Ok(store);
        }

        // The lock is not held across the load
        let store = loader::load(source).await?;
        Ok(self.insert(key, store))
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.stores.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Drops `key` and every older version of its source, and refuses to
    /// cache any of them again
    pub fn retire(&self, key: &CacheKey) {
        if let Ok(mut entries) = self.entries.lock() {
            let floor = entries.floors.entry(key.source.clone()).or_insert(0);
            *floor = (*floor).max(key.version + 1);
            entries
                .stores
                .retain(|k, _| k.source != key.source || k.version > key.version);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.stores.clear();
            entries.floors.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.stores.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
