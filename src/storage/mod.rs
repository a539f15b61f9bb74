//! Storage Module
//!
//! Durable snapshot files for a store.
//!
//! ## Responsibilities
//! - Load the backing file on startup (missing = empty, unparseable = error)
//! - Serialize a point-in-time copy of the mapping
//! - Replace the backing file atomically so a crash never leaves a
//!   half-written file as the current one
//!
//! ## Save Sequence
//! ```text
//!   {data_dir}/.{name}.json.tmp   ← write + fsync
//!                │
//!                │ rename (atomic)
//!                ▼
//!   {data_dir}/{name}.json        ← fsync directory
//! ```

mod snapshot;
mod writer;

pub use snapshot::{decode, encode, load, quarantine, Snapshot};
pub use writer::{remove_stale_temp, temp_path, write_atomic};
