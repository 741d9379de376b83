//! API error taxonomy

use thiserror::Error;

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by the content API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Timeout, DNS or connection failure
    #[error("error fetching {url}: {message}")]
    Communication { url: String, message: String },

    /// The API answered 401 or 403
    #[error("invalid credentials: {url} answered HTTP {status}")]
    Authentication { url: String, status: u16 },

    /// Any other failure: unexpected status, undecodable body, bad client setup
    #[error("unexpected failure for {url}: {message}")]
    Api { url: String, message: String },
}

impl ApiError {
    /// Classify a reqwest failure for `url`
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        let message = err.to_string();

        if err.is_decode() {
            return ApiError::Api { url, message };
        }
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return ApiError::Communication { url, message };
        }
        ApiError::Api { url, message }
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, ApiError::Communication { .. })
    }
}
