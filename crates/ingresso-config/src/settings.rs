//! `ingresso.yaml` settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use ingresso_core::{
    DEFAULT_BASE_URL, DEFAULT_PARTNERSHIP, REQUEST_TIMEOUT_SECS, SCAN_INTERVAL_SECS,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "ingresso.yaml";

/// Runtime settings of the integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Root of the content API, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Partnership whose catalog the wizard offers
    #[serde(default = "default_partnership")]
    pub partnership: String,

    /// Seconds between polls
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// Seconds before a request is abandoned
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_partnership() -> String {
    DEFAULT_PARTNERSHIP.to_string()
}

fn default_scan_interval() -> u64 {
    SCAN_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            partnership: default_partnership(),
            scan_interval: default_scan_interval(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Settings {
    /// Load settings from `ingresso.yaml` in a config directory
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = config_dir.as_ref().join(SETTINGS_FILE);

        if !path.exists() {
            debug!("No {} found, using defaults", SETTINGS_FILE);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse settings from a YAML string
    ///
    /// Syntax errors are reported against `ingresso.yaml`.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Self::parse(yaml, PathBuf::from(SETTINGS_FILE))
    }

    fn parse(yaml: &str, path: PathBuf) -> ConfigResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml)
            .map_err(|source| ConfigError::ParseYaml { path, source })?;
        settings.validated()
    }

    /// Replace the API root, e.g. from a command line flag
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> ConfigResult<Self> {
        self.base_url = base_url.into();
        self.validated()
    }

    /// Check value ranges and normalize the base URL
    pub fn validated(mut self) -> ConfigResult<Self> {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.base_url),
            });
        }
        if self.partnership.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "partnership".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.scan_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scan_interval".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(self)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, "https://api-content.ingresso.com");
        assert_eq!(settings.partnership, "encora");
        assert_eq!(settings.scan_interval(), Duration::from_secs(3600));
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "base_url: http://localhost:8080/\nscan_interval: 600\n",
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.scan_interval, 600);
        assert_eq!(settings.request_timeout, 10);
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "poll_every: 5\n").unwrap();

        let err = Settings::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }

    #[test]
    fn test_yaml_errors_from_string_and_file_match() {
        let err = Settings::from_yaml_str("scan_interval: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));

        let err = Settings::from_yaml_str("poll_every: 5").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }

    #[test]
    fn test_invalid_values() {
        let err = Settings::from_yaml_str("request_timeout: 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "request_timeout"));

        let err = Settings::from_yaml_str("base_url: ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "base_url"));

        let err = Settings::default().with_base_url("").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
