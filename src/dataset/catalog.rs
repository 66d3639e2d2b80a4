//! Published datasets
//!
//! The catalog holds the last successfully loaded version of each dataset.
//! A failed reload never replaces what is already published.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::loader::SourceRef;
use super::types::{Dataset, DatasetSet};

#[derive(Debug, Clone)]
struct CatalogEntry {
    source: SourceRef,
    dataset: Arc<Dataset>,
}

/// Name → current dataset version
#[derive(Debug, Default)]
pub struct DatasetCatalog {
    entries: RwLock<BTreeMap<String, CatalogEntry>>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `dataset` the current version of `source.name`.
    /// Returns the version it replaced, if any.
    pub fn publish(&self, source: SourceRef, dataset: Dataset) -> Option<Arc<Dataset>> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let name = source.name.clone();
        entries
            .insert(
                name,
                CatalogEntry {
                    source,
                    dataset: Arc::new(dataset),
                },
            )
            .map(|old| old.dataset)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Dataset>> {
        self.read(|entries| entries.get(name).map(|e| Arc::clone(&e.dataset)))
    }

    /// Where `name` was loaded from
    pub fn source_of(&self, name: &str) -> Option<SourceRef> {
        self.read(|entries| entries.get(name).map(|e| e.source.clone()))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Dataset>> {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(name).map(|e| e.dataset)
    }

    /// Consistent view of every published dataset
    pub fn snapshot(&self) -> DatasetSet {
        self.read(|entries| {
            let mut set = DatasetSet::new();
            for entry in entries.values() {
                set.insert(Arc::clone(&entry.dataset));
            }
            set
        })
    }

    pub fn len(&self) -> usize {
        self.read(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<String, CatalogEntry>) -> T) -> T {
        match self.entries.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}
