//! Config Entries Manager
//!
//! Manages the lifecycle of configuration entries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{migrate_data, CONFIG_ENTRY_VERSION};
use crate::entry::{ConfigEntry, ConfigEntryState, ConfigEntryUpdate};
use crate::state_machine::InvalidTransition;
use crate::storage::{Storable, Storage, StorageError};

/// Storage key for config entries
pub const STORAGE_KEY: &str = "core.config_entries";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 1;

/// Reason recorded on an entry whose setup was escalated to an auth failure
pub const REASON_AUTH_FAILED: &str = "auth_failed";

/// Config entries errors
#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Invalid entry data: {0}")]
    InvalidData(String),

    #[error("Entry {entry_id} needs to be reconfigured: {reason}")]
    AuthFailed { entry_id: String, reason: String },

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Failure reported by a [`SetupHandler`]
#[derive(Debug, Error)]
pub enum SetupError {
    /// The entry cannot work until the user reconfigures it
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("{0}")]
    Failed(String),
}

/// Integration hooks called when an entry is set up or unloaded
#[async_trait]
pub trait SetupHandler: Send + Sync {
    async fn setup_entry(&self, entry: &ConfigEntry) -> Result<(), SetupError>;

    /// Tear down what `setup_entry` created; `false` reports a failed unload
    async fn unload_entry(&self, entry: &ConfigEntry) -> bool;
}

/// Config entries data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    /// All config entries
    pub entries: Vec<ConfigEntry>,
}

impl Storable for ConfigEntriesData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Config Entries Manager
///
/// Manages the lifecycle of configuration entries including:
/// - Loading/saving from storage, with data migration on load
/// - Entry creation, update and removal
/// - Setup/unload through the integration's [`SetupHandler`]
pub struct ConfigEntries {
    /// Storage backend
    storage: Arc<Storage>,

    /// Domain whose entries get migrated and set up
    domain: String,

    /// entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry>,

    /// Serializes setup/unload
    setup_lock: Mutex<()>,

    /// Serializes writes of the storage file
    save_lock: Mutex<()>,

    /// Integration setup hooks
    handler: Option<Arc<dyn SetupHandler>>,
}

impl ConfigEntries {
    /// Create a new config entries manager for `domain`
    pub fn new(storage: Arc<Storage>, domain: impl Into<String>) -> Self {
        Self {
            storage,
            domain: domain.into(),
            entries: DashMap::new(),
            setup_lock: Mutex::new(()),
            save_lock: Mutex::new(()),
            handler: None,
        }
    }

    /// Attach the integration's setup hooks
    pub fn with_handler(mut self, handler: Arc<dyn SetupHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Load entries from storage
    ///
    /// Entries of this domain are normalized to the current data schema.
    /// Entries whose data cannot be normalized are kept but marked
    /// `MigrationError`. Migrated entries are written back.
    pub async fn load(&self) -> ConfigEntriesResult<()> {
        let Some(file) = self.storage.load::<ConfigEntriesData>().await? else {
            return Ok(());
        };

        info!(
            "Loading {} config entries from storage (v{}.{})",
            file.data.entries.len(),
            file.version,
            file.minor_version
        );

        let mut migrated = 0usize;
        for mut entry in file.data.entries {
            if entry.domain == self.domain {
                debug!("Migrating entry {} from version {}", entry.entry_id, entry.version);
                match migrate_data(&entry.data) {
                    Ok(data) => {
                        if data != entry.data || entry.version != CONFIG_ENTRY_VERSION {
                            entry.data = data;
                            entry.version = CONFIG_ENTRY_VERSION;
                            entry.modified_at = Utc::now();
                            migrated += 1;
                        }
                    }
                    Err(e) => {
                        error!("Migration failed for entry {}: {}", entry.entry_id, e);
                        entry.try_set_state(ConfigEntryState::MigrationError, Some(e.to_string()))?;
                    }
                }
            }
            self.entries.insert(entry.entry_id.clone(), entry);
        }

        if migrated > 0 {
            info!("Migrated {} config entries", migrated);
            self.save().await?;
        }
        Ok(())
    }

    /// Save entries to storage
    pub async fn save(&self) -> ConfigEntriesResult<()> {
        let _lock = self.save_lock.lock().await;
        let mut entries: Vec<ConfigEntry> = self.entries.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        self.storage.save(&ConfigEntriesData { entries }).await?;
        debug!("Saved {} config entries to storage", self.entries.len());
        Ok(())
    }

    /// Get an entry by ID
    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<ConfigEntry> {
        let mut entries: Vec<ConfigEntry> = self.entries.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        entries
    }

    /// Add a new config entry
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        self.entries.insert(entry.entry_id.clone(), entry.clone());
        self.save().await?;

        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );

        Ok(entry)
    }

    /// Update an existing entry
    pub async fn update(
        &self,
        entry_id: &str,
        update: ConfigEntryUpdate,
    ) -> ConfigEntriesResult<ConfigEntry> {
        let updated = {
            let mut entry = self
                .entries
                .get_mut(entry_id)
                .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

            if let Some(title) = update.title {
                entry.title = title;
            }
            if let Some(data) = update.data {
                entry.data = data;
            }
            entry.modified_at = Utc::now();
            entry.clone()
        };

        self.save().await?;

        debug!("Updated config entry: {}", entry_id);
        Ok(updated)
    }

    /// Remove an entry, unloading it first when loaded
    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        self.unload(entry_id).await?;

        let (_, entry) = self
            .entries
            .remove(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        self.save().await?;

        info!(
            "Removed config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry_id
        );

        Ok(entry)
    }

    /// Validate and apply a state transition
    fn transition(
        &self,
        entry_id: &str,
        state: ConfigEntryState,
        reason: Option<String>,
    ) -> ConfigEntriesResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        entry.try_set_state(state, reason)?;
        debug!("Entry {} state changed to {:?}", entry_id, state);
        Ok(())
    }

    /// Setup an entry (call the integration's setup hook)
    ///
    /// A hook failure of kind `AuthFailed` leaves the entry in `SetupError`
    /// with reason [`REASON_AUTH_FAILED`] and returns
    /// [`ConfigEntriesError::AuthFailed`]: the entry must be reconfigured.
    pub async fn setup(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        self.transition(entry_id, ConfigEntryState::SetupInProgress, None)?;

        let Some(handler) = self.handler.clone() else {
            self.transition(entry_id, ConfigEntryState::Loaded, None)?;
            debug!("No setup handler for domain {}, marking as loaded", entry.domain);
            return Ok(());
        };

        match handler.setup_entry(&entry).await {
            Ok(()) => {
                self.transition(entry_id, ConfigEntryState::Loaded, None)?;
                info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                Ok(())
            }
            Err(SetupError::AuthFailed(reason)) => {
                warn!(
                    "Setup of entry {} failed, reconfiguration required: {}",
                    entry_id, reason
                );
                self.transition(
                    entry_id,
                    ConfigEntryState::SetupError,
                    Some(REASON_AUTH_FAILED.to_string()),
                )?;
                Err(ConfigEntriesError::AuthFailed {
                    entry_id: entry_id.to_string(),
                    reason,
                })
            }
            Err(SetupError::Failed(reason)) => {
                warn!("Setup failed for entry {}: {}", entry_id, reason);
                self.transition(entry_id, ConfigEntryState::SetupError, Some(reason.clone()))?;
                Err(ConfigEntriesError::SetupFailed(reason))
            }
        }
    }

    /// Unload an entry; entries that are not set up are left alone
    pub async fn unload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if !matches!(
            entry.state,
            ConfigEntryState::Loaded | ConfigEntryState::SetupError
        ) {
            debug!("Entry {} not set up ({:?}), nothing to unload", entry_id, entry.state);
            return Ok(());
        }

        self.transition(entry_id, ConfigEntryState::UnloadInProgress, None)?;

        if let Some(handler) = self.handler.clone() {
            if !handler.unload_entry(&entry).await {
                warn!("Unload hook reported failure for entry {}", entry_id);
            }
        }

        self.transition(entry_id, ConfigEntryState::NotLoaded, None)?;
        info!("Unloaded entry: {} ({})", entry.title, entry_id);
        Ok(())
    }

    /// Reload an entry (unload + setup)
    pub async fn reload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        self.unload(entry_id).await?;
        self.setup(entry_id).await
    }

    /// Setup every entry of this domain that is not set up yet
    pub async fn setup_all(&self) -> Vec<(String, ConfigEntriesResult<()>)> {
        let mut results = Vec::new();

        for entry in self.entries() {
            if entry.domain != self.domain || entry.state != ConfigEntryState::NotLoaded {
                continue;
            }
            let result = self.setup(&entry.entry_id).await;
            results.push((entry.entry_id, result));
        }

        results
    }

    /// Get count of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
