//! The now-playing sensor entity

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ingresso_api::{ApiResult, IngressoApi, Movie, NowPlayingQuery};
use ingresso_config_entries::IngressoConfig;
use ingresso_core::{
    slugify, EntityId, EntityIdError, State, ATTRIBUTION, DOMAIN, ICON, SENSOR_DOMAIN,
    STATE_UNAVAILABLE, STATE_UNKNOWN, UNIT_OF_MEASUREMENT,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::transform::{DisplayTemplate, MovieCard};

/// Result of the most recent update cycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorState {
    /// Number of movies, `None` until the first successful update
    pub count: Option<usize>,
    pub movies: Vec<MovieCard>,
    /// UTC ISO-8601 time of the last successful update
    pub last_updated: Option<String>,
    pub available: bool,
}

impl Default for SensorState {
    fn default() -> Self {
        Self {
            count: None,
            movies: Vec::new(),
            last_updated: None,
            available: true,
        }
    }
}

/// Sensor counting the movies now playing for one city/theater selection
pub struct IngressoSensor {
    api: Arc<dyn IngressoApi>,
    config: IngressoConfig,
    unique_id: String,
    name: String,
    entity_id: EntityId,
    template: DisplayTemplate,
    state: SensorState,
    /// Last published snapshot, keeps `last_changed` across updates
    published: Option<State>,
}

impl IngressoSensor {
    pub fn new(api: Arc<dyn IngressoApi>, config: IngressoConfig) -> Result<Self, EntityIdError> {
        let unique_id = unique_id(&config);
        let name = entity_name(&config);
        let entity_id = match EntityId::from_name(SENSOR_DOMAIN, &name) {
            Err(EntityIdError::EmptyObjectId) => {
                debug!("Name {:?} has no sluggable characters, using unique id", name);
                EntityId::new(SENSOR_DOMAIN, slugify(&unique_id))?
            }
            other => other?,
        };

        Ok(Self {
            api,
            config,
            unique_id,
            name,
            entity_id,
            template: DisplayTemplate::default(),
            state: SensorState::default(),
            published: None,
        })
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn sensor_state(&self) -> &SensorState {
        &self.state
    }

    /// Listing request for this sensor's selection
    pub fn query(&self) -> NowPlayingQuery {
        NowPlayingQuery::new(
            self.config.city_id.clone(),
            self.config.partnership.clone(),
            self.config.theater.clone(),
        )
    }

    /// Run one polling cycle
    ///
    /// Failures and empty listings mark the sensor unavailable but keep the
    /// previous movies and count.
    pub async fn update(&mut self) -> SensorState {
        debug!("{} - Executando atualização", self.name);
        let result = self.api.fetch_now_playing(&self.query()).await;
        self.apply(result)
    }

    /// Fold one fetch result into the sensor state
    pub fn apply(&mut self, result: ApiResult<Vec<Movie>>) -> SensorState {
        match result {
            Ok(movies) if movies.is_empty() => {
                warn!("{} - Nenhum filme retornado", self.name);
                self.state.available = false;
            }
            Ok(movies) => {
                let theater = self.config.theater_name.as_deref().unwrap_or_default();
                self.state.movies = movies
                    .iter()
                    .map(|movie| MovieCard::from_movie(movie, &self.config.city_name, theater))
                    .collect();
                self.state.count = Some(self.state.movies.len());
                self.state.last_updated = Some(Utc::now().to_rfc3339());
                self.state.available = true;
            }
            Err(e) => {
                error!("Erro ao atualizar sensor Ingresso.com: {}", e);
                self.state.available = false;
            }
        }

        self.state.clone()
    }

    /// Entity attributes, `data` holding the template followed by the cards
    pub fn attributes(&self) -> HashMap<String, Value> {
        let mut data = Vec::with_capacity(self.state.movies.len() + 1);
        data.push(json!(self.template));
        data.extend(self.state.movies.iter().map(|card| json!(card)));

        let mut attributes = HashMap::new();
        attributes.insert("data".to_string(), Value::Array(data));
        attributes.insert("last_updated".to_string(), json!(self.state.last_updated));
        attributes.insert(
            "theater_name".to_string(),
            json!(self.config.theater_name.as_deref().unwrap_or_default()),
        );
        attributes.insert("city_name".to_string(), json!(self.config.city_name));
        attributes.insert(
            "unit_of_measurement".to_string(),
            json!(UNIT_OF_MEASUREMENT),
        );
        attributes.insert("icon".to_string(), json!(ICON));
        attributes.insert("attribution".to_string(), json!(ATTRIBUTION));
        attributes.insert("friendly_name".to_string(), json!(self.name));
        attributes
    }

    /// State value as published
    pub fn state_value(&self) -> String {
        match (self.state.available, self.state.count) {
            (false, _) => STATE_UNAVAILABLE.to_string(),
            (true, Some(count)) => count.to_string(),
            (true, None) => STATE_UNKNOWN.to_string(),
        }
    }

    /// Build the entity state snapshot
    pub fn state(&mut self) -> State {
        let value = self.state_value();
        let attributes = self.attributes();

        let state = match &self.published {
            Some(previous) => previous.with_update(value, attributes),
            None => State::new(self.entity_id.clone(), value, attributes),
        };
        self.published = Some(state.clone());
        state
    }
}

/// `ingresso_{city_id}_{partnership}[_{theater}]`
pub fn unique_id(config: &IngressoConfig) -> String {
    match config.theater.as_deref().filter(|t| !t.is_empty()) {
        Some(theater) => format!(
            "{}_{}_{}_{}",
            DOMAIN, config.city_id, config.partnership, theater
        ),
        None => format!("{}_{}_{}", DOMAIN, config.city_id, config.partnership),
    }
}

/// Theater name when known, else `"{Partnership} {city}"`
pub fn entity_name(config: &IngressoConfig) -> String {
    match config.theater_name.as_deref().filter(|t| !t.is_empty()) {
        Some(theater_name) => theater_name.to_string(),
        None => format!("{} {}", capitalize(&config.partnership), config.city_name),
    }
}

/// First character uppercased, the rest lowercased
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
