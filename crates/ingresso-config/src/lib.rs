//! Settings for the Ingresso.com integration
//!
//! Settings are read from `ingresso.yaml` in the config directory. Every key
//! is optional; a missing file yields the defaults.
//!
//! ```yaml
//! base_url: https://api-content.ingresso.com
//! partnership: encora
//! scan_interval: 3600
//! request_timeout: 10
//! user_agent: Mozilla/5.0
//! ```

mod error;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::{Settings, SETTINGS_FILE};
