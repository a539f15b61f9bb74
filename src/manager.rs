//! Store Manager
//!
//! One store per script, all in one directory.
//!
//! ## Responsibilities
//! - Open stores lazily on first use (`{data_dir}/{name}.json`)
//! - Hand out shared handles to the same store for the same name
//! - Flush every open store at once (shutdown, autosave)

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{validate_store_name, Config};
use crate::error::Result;
use crate::store::Store;

/// Manages the stores under one data directory
///
/// ## Concurrency:
/// - `stores`: RwLock; lookups share the read lock, first open of a name
///   takes the write lock (and the file I/O of loading it)
pub struct StoreManager {
    /// Template config; `store_name` is replaced per store
    config: Config,

    /// Open stores by name
    stores: RwLock<HashMap<String, Arc<Store>>>,
}

impl StoreManager {
    /// Create the manager (and its data directory)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            config,
            stores: RwLock::new(HashMap::new()),
        })
    }

    /// Shared handle to the store called `name`, opening it if needed
    pub fn store(&self, name: &str) -> Result<Arc<Store>> {
        if let Some(store) = self.stores.read().get(name) {
            return Ok(Arc::clone(store));
        }

        validate_store_name(name)?;

        let mut stores = self.stores.write();
        // Another caller may have opened it between the two locks
        if let Some(store) = stores.get(name) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(Store::open(self.config.for_store(name))?);
        tracing::info!("Opened store '{}' ({} keys)", name, store.len());
        stores.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Names of the open stores, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Save every open store
    ///
    /// Keeps going past failures; returns the first error.
    pub fn save_all(&self) -> Result<()> {
        self.save_where(|_| true)
    }

    /// Save only the stores with unsaved changes
    ///
    /// Same failure handling as [`StoreManager::save_all`].
    pub fn save_dirty(&self) -> Result<()> {
        self.save_where(|store| store.is_dirty())
    }

    fn save_where(&self, wanted: impl Fn(&Store) -> bool) -> Result<()> {
        let stores: Vec<Arc<Store>> = self
            .stores
            .read()
            .values()
            .filter(|store| wanted(store))
            .cloned()
            .collect();

        let mut first_error = None;
        for store in stores {
            if let Err(e) = store.save() {
                tracing::error!("Failed to save store '{}': {}", store.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// True if any open store has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.stores.read().values().any(|s| s.is_dirty())
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the template configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
