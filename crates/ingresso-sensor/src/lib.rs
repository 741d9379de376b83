//! Ingresso.com now-playing sensor
//!
//! One sensor per config entry polls the listing of its city (or theater)
//! and exposes the movie count as state, with one card per movie in the
//! `data` attribute.

pub mod platform;
pub mod sensor;
pub mod transform;

pub use platform::{IngressoPlatform, SensorStates, STATES_STORAGE_KEY};
pub use sensor::{entity_name, unique_id, IngressoSensor, SensorState};
pub use transform::{DisplayTemplate, Genres, MovieCard, RELEASE_TOKEN};
