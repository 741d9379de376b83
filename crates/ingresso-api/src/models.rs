//! Record shapes of the content API payloads
//!
//! Only the fields the integration reads are modeled. The API is loose about
//! types: ids arrive as numbers or strings, and text fields occasionally as
//! numbers, lists or `null`. The helpers below normalize those to `String`s.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A city offered by the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    /// State code (e.g. "PE")
    #[serde(default, deserialize_with = "text_or_default")]
    pub uf: String,
}

impl City {
    /// Label shown in the city picklist
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.uf)
    }
}

/// One element of `GET /v0/states`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StateRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cities: Vec<City>,
}

/// Flatten the states payload into one city list sorted by name
pub(crate) fn flatten_states(states: Vec<StateRecord>) -> Vec<City> {
    flatten_cities(states.into_iter().map(|s| s.cities))
}

/// Concatenate city groups and sort them alphabetically by name
pub fn flatten_cities<I>(groups: I) -> Vec<City>
where
    I: IntoIterator<Item = Vec<City>>,
{
    let mut cities: Vec<City> = groups.into_iter().flatten().collect();
    cities.sort_by(|a, b| a.name.cmp(&b.name));
    cities
}

/// A theater of a city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theater {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

/// `GET /v0/theaters/city/{city}/partnership/{partnership}` body
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TheatersPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Theater>,
}

/// A movie of the now-playing listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default, deserialize_with = "opt_text")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<MovieImage>,

    #[serde(default, deserialize_with = "opt_text")]
    pub synopsis: Option<String>,

    #[serde(default, deserialize_with = "opt_text")]
    pub director: Option<String>,

    #[serde(default, deserialize_with = "opt_text")]
    pub cast: Option<String>,

    #[serde(default, deserialize_with = "opt_text")]
    pub distributor: Option<String>,

    #[serde(default, deserialize_with = "opt_text_list")]
    pub genres: Option<Vec<String>>,

    /// Running time in minutes, as sent by the API
    #[serde(default, deserialize_with = "opt_text")]
    pub duration: Option<String>,

    #[serde(rename = "contentRating", default, deserialize_with = "opt_text")]
    pub content_rating: Option<String>,

    #[serde(rename = "premiereDate", default)]
    pub premiere_date: Option<PremiereDate>,

    #[serde(rename = "siteURL", default, deserialize_with = "opt_text")]
    pub site_url: Option<String>,
}

impl Movie {
    /// URL of the first image, if any
    pub fn poster_url(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.as_str())
    }

    /// Premiere day (`YYYY-MM-DD`), the date part of `premiereDate.localDate`
    pub fn premiere_day(&self) -> Option<&str> {
        self.premiere_date
            .as_ref()
            .and_then(|date| date.local_date.as_deref())
            .filter(|date| !date.is_empty())
            .and_then(|date| date.split('T').next())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieImage {
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiereDate {
    #[serde(rename = "localDate", default, deserialize_with = "opt_text")]
    pub local_date: Option<String>,
}

/// Which now-playing listing to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingQuery {
    pub city_id: String,
    pub partnership: String,
    /// Restrict to one theater; `None` lists the whole city
    pub theater: Option<String>,
}

impl NowPlayingQuery {
    pub fn new(
        city_id: impl Into<String>,
        partnership: impl Into<String>,
        theater: Option<String>,
    ) -> Self {
        Self {
            city_id: city_id.into(),
            partnership: partnership.into(),
            // An empty theater id means the whole city
            theater: theater.filter(|t| !t.is_empty()),
        }
    }

    /// Listing URL under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        match &self.theater {
            Some(theater) => format!(
                "{}/v0/templates/nowplaying/{}?partnership={}&theaters={}",
                base_url, self.city_id, self.partnership, theater
            ),
            None => format!(
                "{}/v0/templates/nowplaying/{}?partnership={}",
                base_url, self.city_id, self.partnership
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Loose field decoding
// ---------------------------------------------------------------------------

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(value_to_text).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => None,
    }
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

fn text_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

fn opt_text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.into_iter().filter_map(value_to_text).collect()),
        other => value_to_text(other).map(|text| vec![text]),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
