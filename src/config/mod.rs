use std::env;
use std::time::Duration;

use reqwest::Url;

/// Top-level configuration for the client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let first = |keys: &[&'static str]| -> Option<String> {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let url = first(&["SUPABASE_URL", "VITE_SUPABASE_URL"])
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let parsed = Url::parse(&url).map_err(|err| ConfigError::InvalidUrl {
            value: url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let anon_key = first(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"])
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
        let access_token = first(&["SUPABASE_ACCESS_TOKEN"]);

        let timeout_secs = match first(&["LISTINGS_HTTP_TIMEOUT_SECS"]) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => 30,
        };

        let log_level = first(&["LISTINGS_LOG_LEVEL"]).unwrap_or_else(|| "info".to_string());

        Ok(Self {
            backend: BackendConfig {
                url,
                anon_key,
                access_token,
                timeout: Duration::from_secs(timeout_secs),
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Endpoint and credentials of the hosted backend.
#[derive(Clone)]
pub struct BackendConfig {
    pub url: String,
    /// Public (anon) API key; safe to ship to clients.
    pub anon_key: String,
    /// JWT of a signed-in session.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("SUPABASE_URL '{value}' is not a valid URL: {reason}")]
    InvalidUrl { value: String, reason: String },
    #[error("SUPABASE_URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),
    #[error("LISTINGS_HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{0}'")]
    InvalidTimeout(String),
}
