//! Core types for the Ingresso.com integration
//!
//! This crate provides the fundamental types shared by the other crates:
//! the integration constants, [`EntityId`] and the entity [`State`] snapshot.

mod entity_id;
mod state;

pub use entity_id::{slugify, EntityId, EntityIdError};
pub use state::State;

/// Integration domain, used as the config entry handler name
pub const DOMAIN: &str = "ingresso";

/// Entity platform the integration exposes
pub const SENSOR_DOMAIN: &str = "sensor";

/// State value of an entity whose last update failed
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State value of an entity that has not reported yet
pub const STATE_UNKNOWN: &str = "unknown";

/// Data-provider affiliation whose catalog is queried
pub const DEFAULT_PARTNERSHIP: &str = "encora";

/// Root of the Ingresso.com content API
pub const DEFAULT_BASE_URL: &str = "https://api-content.ingresso.com";

/// Poster used when a movie record carries no images
pub const DEFAULT_POSTER: &str =
    "https://www.promoview.com.br/uploads/2019/01/images/07.01.2019/ingresso.comlogo.jpg";

/// Placeholder for any movie field missing from the API
pub const NOT_INFORMED: &str = "Não informado";

pub const ICON: &str = "mdi:movie";
pub const ATTRIBUTION: &str = "Dados fornecidos por Ingresso.com";
pub const UNIT_OF_MEASUREMENT: &str = "filmes";

/// Seconds between two polls of the now-playing listing
pub const SCAN_INTERVAL_SECS: u64 = 3600;

/// Seconds before an API request is abandoned
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Config entry data keys
pub mod conf {
    pub const CITY_ID: &str = "city_id";
    pub const CITY_NAME: &str = "city_name";
    pub const PARTNERSHIP: &str = "partnership";
    pub const THEATER: &str = "theater";
    pub const THEATER_NAME: &str = "theater_name";
}
