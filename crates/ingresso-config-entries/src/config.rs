//! Typed view of an Ingresso config entry's data
//!
//! Persisted field set, schema version 1:
//! `city_id`, `city_name`, `partnership`, `theater` (optional),
//! `theater_name` (optional).

use std::collections::HashMap;

use ingresso_core::conf;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::manager::{ConfigEntriesError, ConfigEntriesResult};

/// Current schema version of the entry data
pub const CONFIG_ENTRY_VERSION: u32 = 1;

/// City/theater selection persisted by the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressoConfig {
    #[serde(deserialize_with = "id_string")]
    pub city_id: String,

    #[serde(default, deserialize_with = "string_or_default")]
    pub city_name: String,

    pub partnership: String,

    /// Theater id; `None` covers every theater of the city
    #[serde(default, deserialize_with = "opt_id_string", skip_serializing_if = "Option::is_none")]
    pub theater: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theater_name: Option<String>,
}

impl IngressoConfig {
    /// Parse entry data, ignoring unknown keys
    ///
    /// Fails when `city_id` or `partnership` is missing or null.
    pub fn from_data(data: &HashMap<String, Value>) -> ConfigEntriesResult<Self> {
        for key in [conf::CITY_ID, conf::PARTNERSHIP] {
            if data.get(key).map_or(true, Value::is_null) {
                return Err(ConfigEntriesError::InvalidData(format!(
                    "missing required field '{}'",
                    key
                )));
            }
        }

        let object: serde_json::Map<String, Value> =
            data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut config: IngressoConfig = serde_json::from_value(Value::Object(object))
            .map_err(|e| ConfigEntriesError::InvalidData(e.to_string()))?;

        // A theater name without a theater is meaningless
        if config.theater.as_deref().map_or(true, str::is_empty) {
            config.theater = None;
            config.theater_name = None;
        }

        Ok(config)
    }

    /// Serialize to the persisted field set
    pub fn to_data(&self) -> HashMap<String, Value> {
        let mut data = HashMap::new();
        data.insert(conf::CITY_ID.to_string(), Value::from(self.city_id.clone()));
        data.insert(conf::CITY_NAME.to_string(), Value::from(self.city_name.clone()));
        data.insert(
            conf::PARTNERSHIP.to_string(),
            Value::from(self.partnership.clone()),
        );
        if let Some(theater) = &self.theater {
            data.insert(conf::THEATER.to_string(), Value::from(theater.clone()));
            if let Some(name) = &self.theater_name {
                data.insert(conf::THEATER_NAME.to_string(), Value::from(name.clone()));
            }
        }
        data
    }

    /// Overlay this selection onto existing entry data, keeping other keys
    pub fn merge_into(&self, existing: &HashMap<String, Value>) -> HashMap<String, Value> {
        let mut merged = existing.clone();
        merged.remove(conf::THEATER);
        merged.remove(conf::THEATER_NAME);
        merged.extend(self.to_data());
        merged
    }

    /// Entry title, `"{city} - {theater}"` or just the city
    pub fn title(&self) -> String {
        match &self.theater_name {
            Some(theater) => format!("{} - {}", self.city_name, theater),
            None => self.city_name.clone(),
        }
    }
}

/// Normalize legacy entry data to exactly the version 1 field set
///
/// Unknown keys are dropped and `theater_name` only survives next to a
/// `theater`. Idempotent.
pub fn migrate_data(data: &HashMap<String, Value>) -> ConfigEntriesResult<HashMap<String, Value>> {
    IngressoConfig::from_data(data).map(|config| config.to_data())
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
