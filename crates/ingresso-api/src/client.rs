//! HTTP client for the content API

use std::time::Duration;

use async_trait::async_trait;
use ingresso_config::Settings;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::models::{flatten_states, City, Movie, NowPlayingQuery, StateRecord, Theater, TheatersPage};

/// Operations the wizard and the sensor need from the content API
///
/// [`IngressoApiClient`] is the HTTP implementation; tests drive the wizard
/// and the sensor with in-memory doubles.
#[async_trait]
pub trait IngressoApi: Send + Sync {
    /// Movies now playing in a city, optionally restricted to one theater
    async fn fetch_now_playing(&self, query: &NowPlayingQuery) -> ApiResult<Vec<Movie>>;

    /// Every city of every state, sorted by name
    async fn fetch_cities(&self) -> ApiResult<Vec<City>>;

    /// Theaters of a city for a partnership
    async fn fetch_theaters(&self, city_id: &str, partnership: &str) -> ApiResult<Vec<Theater>>;
}

/// Content API client
///
/// Holds one pooled `reqwest::Client`; clone it freely to share the pool.
#[derive(Clone)]
pub struct IngressoApiClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl IngressoApiClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: impl Into<String>,
    ) -> ApiResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Api {
                url: base_url.clone(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            user_agent: user_agent.into(),
        })
    }

    /// Create a client from the integration settings
    pub fn from_settings(settings: &Settings) -> ApiResult<Self> {
        Self::new(
            settings.base_url.clone(),
            settings.request_timeout(),
            settings.user_agent.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `url` and decode the JSON body
    ///
    /// 401/403 map to `Authentication` before any other status check.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Authentication {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))
    }
}

#[async_trait]
impl IngressoApi for IngressoApiClient {
    async fn fetch_now_playing(&self, query: &NowPlayingQuery) -> ApiResult<Vec<Movie>> {
        let url = query.url(&self.base_url);
        let movies: Vec<Movie> = self.get_json(&url).await?;
        debug!(count = movies.len(), city = %query.city_id, "Fetched now-playing listing");
        Ok(movies)
    }

    async fn fetch_cities(&self) -> ApiResult<Vec<City>> {
        let url = format!("{}/v0/states", self.base_url);
        let states: Vec<StateRecord> = self.get_json(&url).await?;
        Ok(flatten_states(states))
    }

    async fn fetch_theaters(&self, city_id: &str, partnership: &str) -> ApiResult<Vec<Theater>> {
        let url = format!(
            "{}/v0/theaters/city/{}/partnership/{}",
            self.base_url, city_id, partnership
        );
        let page: TheatersPage = self.get_json(&url).await?;
        Ok(page.items)
    }
}
