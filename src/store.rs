//! Store Module
//!
//! The key-value store every feature persists through.
//!
//! ## Responsibilities
//! - Own the in-memory mapping (the authoritative copy)
//! - Atomic single-key read/write/arithmetic operations
//! - Prefix enumeration over a point-in-time view
//! - Durable snapshots via the storage module
//! - Load (and optionally quarantine) the backing file on startup

use std::fs;
use std::cmp::Ordering as CmpOrdering;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::command::{Command, Reply};
use crate::config::{Config, CorruptPolicy};
use crate::error::{Result, StoreError};
use crate::ranking;
use crate::storage::{self, Snapshot};
use crate::value::{Number, Value, ValueKind};

/// A namespaced, durable key-value store
///
/// ## Concurrency Model: one RwLock around the whole mapping
///
/// - **Mutations** (set/delete/increment/...): take the write lock for the
///   whole read-modify-write cycle, so two increments on any keys never
///   interleave and no update is lost.
/// - **Reads** (get/has/keys/...): take the read lock; many readers at once.
/// - **Save**: copies the mapping under the read lock, then releases it
///   before serializing and touching the disk. `save_lock` orders
///   concurrent saves so an older copy never replaces a newer file.
///
/// Expected load is tens of identities, so per-key locking isn't worth it.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Backing snapshot file
    path: PathBuf,

    /// In-memory mapping
    data: RwLock<Snapshot>,

    /// Bumped (under the write lock) on every mutation
    generation: AtomicU64,

    /// Generation captured by the last successful save
    saved_generation: AtomicU64,

    /// Serializes save() calls
    save_lock: Mutex<()>,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Remove a temp file left by an interrupted save
    /// 3. Load the backing file (missing → empty)
    /// 4. On a corrupt file: fail, or quarantine it under `StartFresh`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let path = config.store_path();

        if storage::remove_stale_temp(&path)? {
            tracing::warn!(
                "Removed unfinished save for {} (previous snapshot kept)",
                path.display()
            );
        }

        let data = match storage::load(&path) {
            Ok(Some(snapshot)) => {
                tracing::debug!("Loaded {} keys from {}", snapshot.len(), path.display());
                snapshot
            }
            Ok(None) => {
                tracing::debug!("No snapshot at {}, starting empty", path.display());
                Snapshot::new()
            }
            Err(err @ StoreError::Corrupt { .. }) => match config.on_corrupt {
                CorruptPolicy::Fail => {
                    tracing::error!("Refusing to open store: {}", err);
                    return Err(err);
                }
                CorruptPolicy::StartFresh => {
                    let moved = storage::quarantine(&path)?;
                    tracing::warn!(
                        "{}; moved to {} and starting empty",
                        err,
                        moved.display()
                    );
                    Snapshot::new()
                }
            },
            Err(e) => return Err(e),
        };

        Ok(Self {
            config,
            path,
            data: RwLock::new(data),
            generation: AtomicU64::new(0),
            saved_generation: AtomicU64::new(0),
            save_lock: Mutex::new(()),
        })
    }

    /// Open `{dir}/store.json` with default settings
    pub fn open_path(dir: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(dir).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to the matching operation
    pub fn execute(&self, command: Command) -> Result<Reply> {
        let reply = match command {
            Command::Get { key, default } => Reply::Value(self.get_opt(&key).or(default)),
            Command::Has { key } => Reply::Bool(self.has(&key)),
            Command::Set { key, value } => {
                self.set(&key, value)?;
                Reply::Ok
            }
            Command::Delete { key } => Reply::Bool(self.delete(&key)),
            Command::Increment { key, delta } => Reply::Number(self.increment(&key, delta)?),
            Command::Decrement { key, delta } => Reply::Number(self.decrement(&key, delta)?),
            Command::Push { key, item } => Reply::Count(self.push(&key, item)?),
            Command::Keys { prefix } => Reply::Keys(self.keys(&prefix)),
            Command::GetArray { key } => Reply::Keys(self.get_array(&key)),
            Command::Top { prefix, limit } => {
                Reply::Ranking(ranking::top_n(self, &prefix, limit))
            }
            Command::Dump => Reply::Text(self.dump()?),
            Command::Save => {
                self.save()?;
                Reply::Ok
            }
        };
        Ok(reply)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current value of `key`, or `default` if absent
    pub fn get(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get_opt(key).unwrap_or_else(|| default.into())
    }

    /// Current value of `key`, if any
    pub fn get_opt(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    /// Numeric value of `key`, or `default` if absent
    ///
    /// A non-numeric value is a type mismatch, not a silent default.
    pub fn get_number(&self, key: &str, default: impl Into<Number>) -> Result<Number> {
        match self.data.read().get(key) {
            None => Ok(default.into()),
            Some(value) => expect_number(key, value),
        }
    }

    /// True iff `key` holds a value
    pub fn has(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// List value of `key`; empty if absent or not a list
    pub fn get_array(&self, key: &str) -> Vec<String> {
        match self.data.read().get(key) {
            Some(Value::List(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Every key starting with `prefix`, in key order
    ///
    /// The result is a snapshot taken at call time.
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let data = self.data.read();
        prefix_range(&data, prefix).map(|(k, _)| k.clone()).collect()
    }

    /// Every `(key, value)` pair under `prefix`, in key order
    pub fn entries(&self, prefix: &str) -> Vec<(String, Value)> {
        let data = self.data.read();
        prefix_range(&data, prefix)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Copy of the whole mapping
    pub fn snapshot(&self) -> Snapshot {
        self.data.read().clone()
    }

    /// Pretty JSON of the whole mapping
    pub fn dump(&self) -> Result<String> {
        let data = self.data.read();
        Ok(serde_json::to_string_pretty(&*data)?)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Replace the value at `key`, creating it if absent
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        check_key(key)?;
        check_value(key, &value)?;

        let mut data = self.data.write();
        data.insert(key.to_string(), value);
        self.mark_dirty();
        Ok(())
    }

    /// Remove `key`; returns whether it existed
    pub fn delete(&self, key: &str) -> bool {
        let mut data = self.data.write();
        let existed = data.remove(key).is_some();
        if existed {
            self.mark_dirty();
        }
        existed
    }

    /// Remove every key; returns how many were removed
    pub fn clear(&self) -> usize {
        let mut data = self.data.write();
        let removed = data.len();
        data.clear();
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Atomic read-modify-write on one key
    ///
    /// `f` receives the current value (`None` if absent) and may replace it
    /// or set it to `None` to delete the key. If `f` returns an error the
    /// store is left unchanged. Nothing else can touch the store while `f`
    /// runs, so keep it short and never call back into the store from it.
    pub fn update<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Option<Value>) -> Result<T>,
    {
        check_key(key)?;

        let mut data = self.data.write();
        let mut slot = data.get(key).cloned();
        let out = f(&mut slot)?;

        if slot.as_ref() != data.get(key) {
            match slot {
                Some(value) => {
                    check_value(key, &value)?;
                    data.insert(key.to_string(), value);
                }
                None => {
                    data.remove(key);
                }
            }
            self.mark_dirty();
        }

        Ok(out)
    }

    /// Add `delta` to the number at `key` (absent = 0); returns the new value
    pub fn increment(&self, key: &str, delta: impl Into<Number>) -> Result<Number> {
        let delta = delta.into();
        self.update(key, |slot| {
            let current = current_number(key, slot.as_ref(), Number::Int(0))?;
            let next = current
                .checked_add(delta)
                .ok_or_else(|| overflow(key))?;
            *slot = Some(Value::Number(next));
            Ok(next)
        })
    }

    /// Subtract `delta` from the number at `key` (absent = 0); returns the new value
    ///
    /// No floor is applied; see [`Store::decrement_if_at_least`].
    pub fn decrement(&self, key: &str, delta: impl Into<Number>) -> Result<Number> {
        let delta = delta.into();
        self.update(key, |slot| {
            let current = current_number(key, slot.as_ref(), Number::Int(0))?;
            let next = current
                .checked_sub(delta)
                .ok_or_else(|| overflow(key))?;
            *slot = Some(Value::Number(next));
            Ok(next)
        })
    }

    /// Subtract `delta` only if the current value (absent = 0) is at least `delta`
    ///
    /// Returns false and leaves the value untouched otherwise. A negative
    /// `delta` is rejected.
    pub fn decrement_if_at_least(&self, key: &str, delta: impl Into<Number>) -> Result<bool> {
        let delta = delta.into();
        if delta.is_negative() {
            return Err(StoreError::InvalidValue {
                key: key.to_string(),
                reason: format!("conditional decrement by negative amount {}", delta),
            });
        }
        self.update(key, |slot| {
            let current = current_number(key, slot.as_ref(), Number::Int(0))?;
            if current.total_cmp(&delta) == CmpOrdering::Less {
                return Ok(false);
            }
            let next = current
                .checked_sub(delta)
                .ok_or_else(|| overflow(key))?;
            *slot = Some(Value::Number(next));
            Ok(true)
        })
    }

    /// Existing value, or store `default` and return it
    pub fn get_or_set(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        let default = default.into();
        self.update(key, |slot| Ok(slot.get_or_insert(default).clone()))
    }

    /// Append `item` to the list at `key` (absent = empty); returns the new length
    pub fn push(&self, key: &str, item: impl Into<String>) -> Result<usize> {
        let item = item.into();
        self.update(key, |slot| {
            match slot {
                Some(Value::List(items)) => {
                    items.push(item);
                    return Ok(items.len());
                }
                Some(other) => {
                    return Err(StoreError::TypeMismatch {
                        key: key.to_string(),
                        expected: ValueKind::List,
                        found: other.kind(),
                    });
                }
                None => {}
            }
            *slot = Some(Value::List(vec![item]));
            Ok(1)
        })
    }

    // =========================================================================
    // Durability
    // =========================================================================

    /// Write the current mapping to the backing file
    ///
    /// Holds the data lock only long enough to copy the mapping. On failure
    /// memory stays authoritative and the previous file is untouched; the
    /// next save retries.
    pub fn save(&self) -> Result<()> {
        let _save_guard = self.save_lock.lock();

        let (snapshot, generation) = {
            let data = self.data.read();
            (data.clone(), self.generation.load(Ordering::SeqCst))
        };

        let bytes = storage::encode(&snapshot, self.config.pretty)?;

        if let Err(e) = storage::write_atomic(&self.path, &bytes, self.config.sync_writes) {
            tracing::warn!("Save of {} failed: {}", self.path.display(), e);
            return Err(e);
        }

        self.saved_generation.store(generation, Ordering::SeqCst);
        tracing::debug!(
            "Saved {} keys ({} bytes) to {}",
            snapshot.len(),
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Final flush; consumes the store
    pub fn close(self) -> Result<()> {
        self.save()
    }

    /// True if memory is ahead of the last successful save
    pub fn is_dirty(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.saved_generation.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the store (file stem)
    pub fn name(&self) -> &str {
        &self.config.store_name
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn mark_dirty(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.is_dirty() {
            if let Err(e) = self.save() {
                tracing::error!("Unsaved changes lost for {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Keys `>= prefix` up to the first one that no longer starts with it
fn prefix_range<'a>(
    data: &'a Snapshot,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
    data.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(k, _)| k.starts_with(prefix))
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

fn check_value(key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Number(n) if !n.is_finite() => Err(StoreError::InvalidValue {
            key: key.to_string(),
            reason: "numbers must be finite".to_string(),
        }),
        _ => Ok(()),
    }
}

fn expect_number(key: &str, value: &Value) -> Result<Number> {
    value.as_number().ok_or_else(|| StoreError::TypeMismatch {
        key: key.to_string(),
        expected: ValueKind::Number,
        found: value.kind(),
    })
}

/// Number held in `slot`, or `absent` if empty
pub(crate) fn current_number(key: &str, slot: Option<&Value>, absent: Number) -> Result<Number> {
    match slot {
        None => Ok(absent),
        Some(value) => expect_number(key, value),
    }
}

pub(crate) fn overflow(key: &str) -> StoreError {
    StoreError::Overflow {
        key: key.to_string(),
    }
}
