//! Config Entries
//!
//! Persisted city/theater selections and their lifecycle (setup, unload,
//! reload).
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single persisted selection
//! - [`IngressoConfig`] - Typed view of an entry's data
//! - [`ConfigEntries`] - Manager for all config entries
//!
//! # Storage
//!
//! Config entries are persisted in `.storage/core.config_entries` with
//! version tracking. Entry data is migrated to the current schema on load.

pub mod config;
pub mod entry;
pub mod manager;
pub mod state_machine;
pub mod storage;

// Re-export main types
pub use config::{migrate_data, IngressoConfig, CONFIG_ENTRY_VERSION};
pub use entry::{ConfigEntry, ConfigEntryState, ConfigEntryUpdate};
pub use manager::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, SetupError,
    SetupHandler, REASON_AUTH_FAILED, STORAGE_KEY, STORAGE_MINOR_VERSION, STORAGE_VERSION,
};
pub use state_machine::InvalidTransition;
pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};
