//! Ingresso.com content API client
//!
//! Wraps the read-only JSON endpoints the integration consumes:
//!
//! - `GET /v0/templates/nowplaying/{city}?partnership=..[&theaters=..]` - movies showing
//! - `GET /v0/states` - states with their nested cities
//! - `GET /v0/theaters/city/{city}/partnership/{partnership}` - theaters of a city
//!
//! Every call maps failures to [`ApiError`]: HTTP 401/403 become
//! `Authentication`, timeouts and transport failures `Communication`, and
//! anything else `Api`. Nothing is retried.

pub mod client;
pub mod error;
pub mod models;

pub use client::{IngressoApi, IngressoApiClient};
pub use error::{ApiError, ApiResult};
pub use models::{flatten_cities, City, Movie, MovieImage, NowPlayingQuery, PremiereDate, Theater};
