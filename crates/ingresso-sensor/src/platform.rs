//! Sensor platform
//!
//! Owns one [`IngressoSensor`] per loaded config entry and plugs into the
//! config entries lifecycle as its [`SetupHandler`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use ingresso_api::IngressoApi;
use ingresso_config_entries::{
    ConfigEntry, IngressoConfig, SetupError, SetupHandler, Storable, Storage, StorageResult,
};
use ingresso_core::State;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::sensor::IngressoSensor;

/// Storage key of the published entity states
pub const STATES_STORAGE_KEY: &str = "ingresso.states";

/// Entity states as written by the run loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorStates {
    pub states: Vec<State>,
}

impl Storable for SensorStates {
    const KEY: &'static str = STATES_STORAGE_KEY;
    const VERSION: u32 = 1;
    const MINOR_VERSION: u32 = 1;
}

/// Live sensors keyed by config entry id
pub struct IngressoPlatform {
    api: Arc<dyn IngressoApi>,
    sensors: DashMap<String, Arc<Mutex<IngressoSensor>>>,
}

impl IngressoPlatform {
    pub fn new(api: Arc<dyn IngressoApi>) -> Self {
        Self {
            api,
            sensors: DashMap::new(),
        }
    }

    /// Sensor of a loaded entry
    pub fn sensor(&self, entry_id: &str) -> Option<Arc<Mutex<IngressoSensor>>> {
        self.sensors.get(entry_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    fn all(&self) -> Vec<(String, Arc<Mutex<IngressoSensor>>)> {
        let mut sensors: Vec<_> = self
            .sensors
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        sensors.sort_by(|a, b| a.0.cmp(&b.0));
        sensors
    }

    /// Run one update cycle on every sensor
    ///
    /// Sensors update concurrently; each one's lock keeps its own cycles
    /// from overlapping.
    pub async fn update_all(&self) -> Vec<State> {
        let updates = self.all().into_iter().map(|(entry_id, sensor)| async move {
            let mut sensor = sensor.lock().await;
            let result = sensor.update().await;
            debug!(
                "Entry {} updated: available={}, count={:?}",
                entry_id, result.available, result.count
            );
            sensor.state()
        });

        join_all(updates).await
    }

    /// Current state of every sensor, without polling
    pub async fn states(&self) -> Vec<State> {
        let mut states = Vec::with_capacity(self.sensors.len());
        for (_, sensor) in self.all() {
            states.push(sensor.lock().await.state());
        }
        states
    }

    /// Write the current states to `.storage/ingresso.states`
    pub async fn save_states(&self, storage: &Storage) -> StorageResult<()> {
        let states = SensorStates {
            states: self.states().await,
        };
        storage.save(&states).await
    }
}

#[async_trait]
impl SetupHandler for IngressoPlatform {
    /// Probe the listing once, then register the sensor seeded with it
    ///
    /// Any probe failure means the stored selection no longer works and is
    /// reported as [`SetupError::AuthFailed`].
    async fn setup_entry(&self, entry: &ConfigEntry) -> Result<(), SetupError> {
        let config = IngressoConfig::from_data(&entry.data)
            .map_err(|e| SetupError::Failed(e.to_string()))?;
        let mut sensor = IngressoSensor::new(self.api.clone(), config)
            .map_err(|e| SetupError::Failed(e.to_string()))?;

        let probe = self.api.fetch_now_playing(&sensor.query()).await;
        if let Err(e) = &probe {
            warn!("Falha ao conectar com a API Ingresso.com: {}", e);
            return Err(SetupError::AuthFailed(e.to_string()));
        }
        sensor.apply(probe);

        info!(
            "Sensor {} ({}) set up for entry {}",
            sensor.entity_id(),
            sensor.unique_id(),
            entry.entry_id
        );
        self.sensors
            .insert(entry.entry_id.clone(), Arc::new(Mutex::new(sensor)));
        Ok(())
    }

    async fn unload_entry(&self, entry: &ConfigEntry) -> bool {
        // Entries whose setup failed never registered a sensor
        if self.sensors.remove(&entry.entry_id).is_none() {
            debug!("No sensor registered for entry {}", entry.entry_id);
        }
        true
    }
}
