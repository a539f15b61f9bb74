//! # NanoStore
//!
//! A namespaced, durable key-value store for game-server scripts:
//! - Typed values (number, bool, string, list of strings)
//! - Atomic single-key arithmetic with no lost updates across threads
//! - Prefix enumeration and top-N ranking
//! - Human-editable JSON snapshots replaced atomically on save
//! - Background autosave with a bounded loss window
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │  Tick context        │   │  Chat context        │
//! │  (events, commands)  │   │  (async handlers)    │
//! └──────────┬───────────┘   └───────────┬──────────┘
//!            │   Ledger / ranking / get / set / increment
//!            └──────────────┬────────────┘
//!                           ▼
//!                 ┌───────────────────┐        ┌─────────────┐
//!                 │      Store        │◄───────│  Autosaver  │
//!                 │ (RwLock<BTreeMap>)│  save  │  (thread)   │
//!                 └─────────┬─────────┘        └─────────────┘
//!                           │ copy under lock, write outside it
//!                           ▼
//!                 ┌───────────────────┐
//!                 │  {name}.json      │
//!                 │ (tmp + rename)    │
//!                 └───────────────────┘
//! ```
//!
//! Keys are conventionally `"{namespace}.{identity}"` (`bal.Steve`,
//! `deaths.Alex`); the store itself does not enforce any structure.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod value;

pub mod storage;
pub mod store;
pub mod manager;
pub mod autosave;
pub mod command;
pub mod ranking;
pub mod ledger;
pub mod session;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::{ticks, Config, CorruptPolicy};
pub use value::{Number, Value, ValueKind};
pub use store::Store;
pub use manager::StoreManager;
pub use autosave::{Autosaver, Persist};
pub use command::{Command, Reply};
pub use ranking::{top_n, Ranked};
pub use ledger::Ledger;
pub use session::SessionRegistry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of NanoStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
