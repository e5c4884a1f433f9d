use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::{Error, Result};

/// Prefix of environment overrides, e.g. `JOBTRACK_API__BASE_URL`.
pub const ENV_PREFIX: &str = "JOBTRACK_";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Backend endpoints and request bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root of the backend, e.g. `http://localhost:8000/`.
    pub base_url: String,
    /// Token refresh endpoint, relative to `base_url`.
    pub refresh_path: String,
    /// Social sign-in endpoint, relative to `base_url`.
    pub social_login_path: String,
    /// Upper bound on a single refresh call.
    pub refresh_timeout_secs: u64,
    /// Upper bound on any single HTTP call.
    pub request_timeout_secs: u64,
    pub default_page_size: Option<u32>,
}

/// Where the credential pair is kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    /// Nothing survives the process.
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Override the credential file location (file backend only).
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Override the log directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            refresh_path: "api/token/refresh/".to_string(),
            social_login_path: "auth/google/".to_string(),
            refresh_timeout_secs: 10,
            request_timeout_secs: 30,
            default_page_size: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl ApiConfig {
    /// Parsed base URL, always ending in `/` so relative paths join below it.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| Error::config(format!("Invalid base_url '{raw}': {e}")))
    }

    pub fn refresh_url(&self) -> Result<Url> {
        Ok(self.base_url()?.join(self.refresh_path.trim_start_matches('/'))?)
    }

    pub fn social_login_url(&self) -> Result<Url> {
        Ok(self
            .base_url()?
            .join(self.social_login_path.trim_start_matches('/'))?)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl AppConfig {
    /// Load configuration from defaults, `~/.config/jobtrack/config.toml`
    /// and `JOBTRACK_*` environment variables.
    /// Returns `Default` if the layers cannot be merged.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Like [`AppConfig::load`] with an explicit config file.
    pub fn load_from(path: PathBuf) -> Self {
        match Self::from_figment(Self::figment(&path)) {
            Ok(config) => {
                log::debug!("Loaded config (file: {})", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config from {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The layered provider chain, lowest priority first.
    pub fn figment(path: &std::path::Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| Error::config(e.to_string()))?;
        config.api.base_url()?;
        Ok(config)
    }

    /// Resolved data directory for credentials and logs.
    pub fn data_dir(&self) -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("jobtrack"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Resolved log directory (override or under the data directory).
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("logs"))
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("jobtrack").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
