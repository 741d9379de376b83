//! Wiring of settings, storage, API client, entries, flows and sensors

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use ingresso_api::IngressoApiClient;
use ingresso_config::Settings;
use ingresso_config_entries::{ConfigEntries, ConfigEntriesError, ConfigEntriesResult, Storage};
use ingresso_config_flow::FlowManager;
use ingresso_core::{State, DOMAIN};
use ingresso_sensor::IngressoPlatform;
use tracing::{error, info, warn};

/// The running integration
pub struct Ingresso {
    pub settings: Settings,
    pub storage: Arc<Storage>,
    pub entries: Arc<ConfigEntries>,
    pub platform: Arc<IngressoPlatform>,
    pub flows: FlowManager,
}

impl Ingresso {
    /// Load settings and stored entries from `config_dir`
    pub async fn load(config_dir: &Path, base_url: Option<&str>) -> Result<Self> {
        let mut settings = Settings::load(config_dir)
            .with_context(|| format!("loading settings from {}", config_dir.display()))?;
        if let Some(base_url) = base_url {
            settings = settings.with_base_url(base_url)?;
        }

        Self::with_settings(config_dir, settings).await
    }

    pub async fn with_settings(config_dir: &Path, settings: Settings) -> Result<Self> {
        let api = Arc::new(IngressoApiClient::from_settings(&settings)?);
        let storage = Arc::new(Storage::new(config_dir));
        let platform = Arc::new(IngressoPlatform::new(api.clone()));

        let entries = Arc::new(
            ConfigEntries::new(storage.clone(), DOMAIN).with_handler(platform.clone()),
        );
        entries.load().await.context("loading config entries")?;

        let flows = FlowManager::new(api, entries.clone(), settings.partnership.clone());

        info!(
            "Loaded {} config entries from {}",
            entries.len(),
            storage.storage_dir().display()
        );

        Ok(Self {
            settings,
            storage,
            entries,
            platform,
            flows,
        })
    }

    /// Set up every stored entry, reporting the ones needing attention
    ///
    /// Returns how many entries are loaded afterwards.
    pub async fn setup_entries(&self) -> usize {
        for (entry_id, result) in self.entries.setup_all().await {
            if let Err(e) = result {
                report_setup_error(&entry_id, &e);
            }
        }
        self.platform.len()
    }

    /// Poll every sensor once and persist the states
    pub async fn update(&self) -> Result<Vec<State>> {
        self.platform.update_all().await;
        self.publish().await
    }

    /// Persist the current sensor states without polling
    ///
    /// Sensors set up in this process already hold their setup fetch.
    pub async fn publish(&self) -> Result<Vec<State>> {
        self.platform
            .save_states(&self.storage)
            .await
            .context("saving sensor states")?;
        Ok(self.platform.states().await)
    }
}

/// Log a failed setup; auth failures tell how to fix them
pub fn report_setup_error(entry_id: &str, err: &ConfigEntriesError) {
    match err {
        ConfigEntriesError::AuthFailed { reason, .. } => {
            warn!(
                "Entry {}: reconfiguration required ({}). Run `ingresso reconfigure {}`",
                entry_id, reason, entry_id
            );
        }
        other => error!("Entry {} could not be set up: {}", entry_id, other),
    }
}

/// Human-readable outcome of an entry setup for CLI output
pub fn describe_setup(result: &ConfigEntriesResult<()>) -> &'static str {
    match result {
        Ok(()) => "loaded",
        Err(ConfigEntriesError::AuthFailed { .. }) => "reconfiguration required",
        Err(_) => "setup failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_setup() {
        assert_eq!(describe_setup(&Ok(())), "loaded");
        assert_eq!(
            describe_setup(&Err(ConfigEntriesError::AuthFailed {
                entry_id: "01abc".to_string(),
                reason: "timeout".to_string(),
            })),
            "reconfiguration required"
        );
        assert_eq!(
            describe_setup(&Err(ConfigEntriesError::NotFound("01abc".to_string()))),
            "setup failed"
        );
    }

    #[tokio::test]
    async fn test_load_empty_config_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = Ingresso::load(dir.path(), Some("http://127.0.0.1:1/"))
            .await
            .unwrap();

        assert_eq!(app.settings.base_url, "http://127.0.0.1:1");
        assert!(app.entries.is_empty());
        assert_eq!(app.setup_entries().await, 0);
        assert!(app.update().await.unwrap().is_empty());
        assert!(app.publish().await.unwrap().is_empty());
        assert!(app.storage.file_path("ingresso.states").exists());
    }

    #[tokio::test]
    async fn test_setup_fetch_is_the_first_update() {
        use ingresso_config_entries::{ConfigEntry, IngressoConfig};
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"title": "Duna"}, {"title": "Wicked"}])),
            )
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let app = Ingresso::load(dir.path(), Some(&server.uri())).await.unwrap();
        let config = IngressoConfig {
            city_id: "48".to_string(),
            city_name: "Recife".to_string(),
            partnership: "encora".to_string(),
            theater: Some("1260".to_string()),
            theater_name: Some("UCI Recife".to_string()),
        };
        app.entries
            .add(ConfigEntry::new(DOMAIN, config.title()).with_data(config.to_data()))
            .await
            .unwrap();

        assert_eq!(app.setup_entries().await, 1);
        let states = app.publish().await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].state, "2");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        app.update().await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_base_url_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Ingresso::load(dir.path(), Some("ftp://example.com")).await.is_err());
    }
}
