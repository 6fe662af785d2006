//! Runtime configuration.
//!
//! Values are layered: an optional file first, then `AMPARO_*` environment
//! variables. Nested keys use a double underscore, so
//! `AMPARO_BACKEND__ANON_KEY` sets `backend.anon_key` and
//! `AMPARO_SYNC__GUARD_TIMEOUT_MS` sets `sync.guard_timeout_ms`.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use amparo_domain::SyncSettings;

const ENV_PREFIX: &str = "AMPARO";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The values were read but are not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: Url,
    /// Public anon key, sent as the `apikey` header.
    pub anon_key: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_request_timeout_secs() -> u64 {
    10
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Backend connection.
    pub backend: BackendConfig,
    /// Public address of the application, used to build absolute links
    /// such as the password-reset redirect.
    #[serde(default)]
    pub site_url: Option<Url>,
    /// Synchronizer and guard tunables.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl AppConfig {
    /// Loads configuration from an optional file and the process environment.
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder.add_source(environment(None)).build()?;
        Self::finish(config)
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment.
    ///
    /// # Errors
    /// Returns an error if the values cannot be parsed or are invalid.
    pub fn from_env_map(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(environment(Some(vars)))
            .build()?;
        Self::finish(config)
    }

    /// Parses configuration from a JSON document.
    ///
    /// # Errors
    /// Returns an error if the document cannot be parsed or is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?;
        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Checks values serde cannot check.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.backend.url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "backend.url must be http or https, got {}",
                self.backend.url.scheme()
            )));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.anon_key is empty".to_string()));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "backend.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.sync.guard_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync.guard_timeout_ms must be positive".to_string(),
            ));
        }
        for (key, route) in [
            ("sync.home_route", &self.sync.home_route),
            ("sync.login_route", &self.sync.login_route),
        ] {
            if !route.starts_with('/') {
                return Err(ConfigError::Invalid(format!("{key} must start with '/'")));
            }
        }
        Ok(())
    }

    /// Absolute password-reset redirect.
    ///
    /// A relative `sync.password_reset_redirect` is resolved against
    /// `site_url`; without a site URL it is returned unchanged.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the redirect cannot be joined.
    pub fn password_reset_redirect(&self) -> Result<String, ConfigError> {
        let redirect = &self.sync.password_reset_redirect;
        if Url::parse(redirect).is_ok() {
            return Ok(redirect.clone());
        }
        match &self.site_url {
            Some(site) => site
                .join(redirect)
                .map(String::from)
                .map_err(|e| ConfigError::Invalid(format!("sync.password_reset_redirect: {e}"))),
            None => Ok(redirect.clone()),
        }
    }
}

fn environment(vars: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(vars.map(|vars| vars.into_iter().collect::<config::Map<_, _>>()))
}
