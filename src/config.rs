//! Configuration for NanoStore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Convert a number of host ticks (20 per second) to wall time
pub const fn ticks(n: u64) -> Duration {
    Duration::from_millis(n * 50)
}

/// Main configuration for a NanoStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for store files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {store_name}.json        (current snapshot)
    ///     └── .{store_name}.json.tmp   (in-flight save, renamed over the snapshot)
    pub data_dir: PathBuf,

    /// Name of the store; the backing file is `{store_name}.json`
    pub store_name: String,

    /// What to do when the backing file exists but cannot be parsed
    pub on_corrupt: CorruptPolicy,

    /// Pretty-print the JSON snapshot
    pub pretty: bool,

    /// fsync the temp file and its directory on every save
    pub sync_writes: bool,

    // -------------------------------------------------------------------------
    // Autosave Configuration
    // -------------------------------------------------------------------------
    /// Unconditional save cadence
    pub autosave_interval: Duration,

    /// Debounce delay after which a dirty store is flushed (None disables)
    pub flush_delay: Option<Duration>,
}

/// Load behaviour for an unreadable backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptPolicy {
    /// Refuse to open (default)
    Fail,

    /// Move the file aside as `{name}.json.corrupt-{unix_secs}` and start empty
    StartFresh,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./nanostore_data"),
            store_name: "store".to_string(),
            on_corrupt: CorruptPolicy::Fail,
            pretty: true,
            sync_writes: true,
            autosave_interval: ticks(20 * 60 * 5), // 5 minutes
            flush_delay: Some(ticks(20)),          // 1 second
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the backing snapshot file
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.store_name))
    }

    /// Copy of this config pointing at another store in the same directory
    pub fn for_store(&self, name: &str) -> Config {
        Config {
            store_name: name.to_string(),
            ..self.clone()
        }
    }

    /// Check invariants the builder can't enforce by type
    pub fn validate(&self) -> Result<()> {
        validate_store_name(&self.store_name)?;
        if self.autosave_interval.is_zero() {
            return Err(StoreError::Config(
                "autosave_interval must be non-zero".to_string(),
            ));
        }
        if matches!(self.flush_delay, Some(d) if d.is_zero()) {
            return Err(StoreError::Config("flush_delay must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Store names become file names, so keep them to a single path component
pub fn validate_store_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::Config(format!("invalid store name '{}'", name)))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the store name
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.config.store_name = name.into();
        self
    }

    /// Set the corrupt-file policy
    pub fn on_corrupt(mut self, policy: CorruptPolicy) -> Self {
        self.config.on_corrupt = policy;
        self
    }

    /// Toggle pretty-printed snapshots
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }

    /// Toggle fsync on save
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    /// Set the unconditional autosave interval
    pub fn autosave_interval(mut self, interval: Duration) -> Self {
        self.config.autosave_interval = interval;
        self
    }

    /// Set (or disable) the dirty-flush debounce delay
    pub fn flush_delay(mut self, delay: Option<Duration>) -> Self {
        self.config.flush_delay = delay;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
