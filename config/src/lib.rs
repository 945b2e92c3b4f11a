//! Configuration loading for the staff directory.
//!
//! Reads `~/.staffdir/config.toml`. Every section and field is optional; a
//! missing file means "all defaults".
//!
//! ```toml
//! [api]
//! base_url = "https://reqres.in/api"
//! api_key = "${REQRES_API_KEY}"
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! allow_insecure_http = false
//!
//! [directory]
//! max_asset_bytes = 8388608
//! max_concurrent_assets = 6
//! ```
//!
//! `STAFFDIR_BASE_URL` and `STAFFDIR_API_KEY` override the file.

use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use staffdir_providers::{ClientError, DEFAULT_BASE_URL, HttpSettings};
use thiserror::Error;

pub const BASE_URL_ENV: &str = "STAFFDIR_BASE_URL";
pub const API_KEY_ENV: &str = "STAFFDIR_API_KEY";

#[derive(Debug, Default, Deserialize)]
pub struct StaffdirConfig {
    pub api: Option<ApiConfig>,
    pub directory: Option<DirectoryConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    InvalidBaseUrl(#[from] ClientError),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::InvalidBaseUrl(_) => None,
        }
    }
}

#[derive(Default, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    /// Sent as `x-api-key` on listing and login requests. Supports `${VAR}` expansion.
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    /// Allow `http://` endpoints. Off by default.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

// Manual Debug impl to prevent leaking the API key in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("allow_insecure_http", &self.allow_insecure_http)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryConfig {
    /// Upper bound on one avatar download.
    pub max_asset_bytes: Option<usize>,
    /// Cap on avatar fetches in flight at once. Unbounded when absent or 0.
    pub max_concurrent_assets: Option<usize>,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                out.push_str(&env::var(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            Some(_) => {
                // `${}` is kept literally.
                out.push_str("${}");
                rest = &after[1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl StaffdirConfig {
    /// Load from the default location. `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Resolve HTTP settings, applying `STAFFDIR_*` environment overrides.
    pub fn http_settings(&self) -> Result<HttpSettings, ConfigError> {
        self.http_settings_with(|key| env::var(key).ok())
    }

    /// Resolve HTTP settings with an explicit environment lookup.
    pub fn http_settings_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<HttpSettings, ConfigError> {
        let api = self.api.as_ref();
        let non_blank = |value: String| (!value.trim().is_empty()).then_some(value);

        let base_url = lookup(BASE_URL_ENV)
            .and_then(non_blank)
            .or_else(|| api.and_then(|a| a.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = lookup(API_KEY_ENV)
            .and_then(non_blank)
            .or_else(|| api.and_then(|a| a.api_key.as_deref()).map(expand_env_vars));

        let mut settings = HttpSettings::new(&base_url)?.with_api_key(api_key);
        if let Some(api) = api {
            if let Some(secs) = api.timeout_secs.filter(|s| *s > 0) {
                settings.timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = api.connect_timeout_secs.filter(|s| *s > 0) {
                settings.connect_timeout = Duration::from_secs(secs);
            }
            settings.allow_insecure_http = api.allow_insecure_http;
        }
        if let Some(bytes) = self
            .directory
            .as_ref()
            .and_then(|d| d.max_asset_bytes)
            .filter(|b| *b > 0)
        {
            settings.max_asset_bytes = bytes;
        }
        Ok(settings)
    }

    #[must_use]
    pub fn max_concurrent_assets(&self) -> Option<NonZeroUsize> {
        self.directory
            .as_ref()
            .and_then(|d| d.max_concurrent_assets)
            .and_then(NonZeroUsize::new)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".staffdir").join("config.toml"))
}
