//! `~/.warden/config.toml`
//!
//! ```toml
//! [admin]
//! base_url = "https://admin.example.com/api/admin"
//! device_id = "ops-laptop-1"
//! allow_insecure_http = false
//! request_timeout_secs = 30
//! connect_timeout_secs = 30
//!
//! [credentials]
//! token_env = "WARDEN_TOKEN"
//! token_file = "${HOME}/.warden/token"
//! ```
//!
//! Every key is optional. `WARDEN_ADMIN_BASE_URL` and `WARDEN_DEVICE_ID`
//! override their file counterparts.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;
use warden_client::{
    ApiError, DEFAULT_ADMIN_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    HttpSettings, is_loopback,
};
use warden_types::DeviceId;

use crate::credentials::{ChainedCredentials, CredentialProvider, EnvCredentials, FileCredentials};

pub const BASE_URL_ENV: &str = "WARDEN_ADMIN_BASE_URL";
pub const DEVICE_ID_ENV: &str = "WARDEN_DEVICE_ID";
pub const DEFAULT_TOKEN_ENV: &str = "WARDEN_TOKEN";

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
    #[error("invalid admin base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct WardenConfig {
    pub admin: Option<AdminConfig>,
    pub credentials: Option<CredentialsConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminConfig {
    pub base_url: Option<String>,
    /// Attribution header value. A random id per process when unset.
    pub device_id: Option<String>,
    /// Defaults to `true` for loopback hosts only.
    pub allow_insecure_http: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    pub token_env: Option<String>,
    /// Path to a file holding the bearer token. `${VAR}` references are expanded.
    pub token_file: Option<String>,
}

/// Expand `${VAR}` references; unset variables become empty.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

fn env_override(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

impl WardenConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to read config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "Failed to parse config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url_with(env_override(BASE_URL_ENV))
    }

    fn base_url_with(&self, override_url: Option<String>) -> String {
        override_url
            .or_else(|| self.admin.as_ref().and_then(|a| a.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_ADMIN_BASE_URL.to_string())
    }

    pub fn http_settings(&self) -> Result<HttpSettings, ConfigError> {
        self.http_settings_for(&self.base_url())
    }

    fn http_settings_for(&self, base_url: &str) -> Result<HttpSettings, ConfigError> {
        let settings = HttpSettings::new(base_url).map_err(|e| match e {
            ApiError::InvalidBaseUrl { url, reason } => ConfigError::InvalidBaseUrl { url, reason },
            other => ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: other.to_string(),
            },
        })?;

        let admin = self.admin.as_ref();
        let allow_insecure = admin
            .and_then(|a| a.allow_insecure_http)
            .unwrap_or_else(|| is_loopback(&settings.base_url));
        let connect = admin
            .and_then(|a| a.connect_timeout_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        let request = admin
            .and_then(|a| a.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        if !allow_insecure && settings.base_url.scheme() == "http" {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "plain http is only allowed for loopback hosts unless allow_insecure_http is set".into(),
            });
        }

        Ok(settings
            .https_only(!allow_insecure)
            .timeouts(Duration::from_secs(connect), Duration::from_secs(request)))
    }

    /// Env override, then config, then a fresh random id.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id_with(env_override(DEVICE_ID_ENV))
    }

    fn device_id_with(&self, override_id: Option<String>) -> DeviceId {
        override_id
            .or_else(|| self.admin.as_ref().and_then(|a| a.device_id.clone()))
            .filter(|id| !id.trim().is_empty())
            .map_or_else(|| DeviceId::new(uuid::Uuid::new_v4().to_string()), DeviceId::new)
    }

    /// Environment variable first, then the token file if configured.
    #[must_use]
    pub fn credential_provider(&self) -> ChainedCredentials {
        let credentials = self.credentials.as_ref();
        let var = credentials
            .and_then(|c| c.token_env.clone())
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());

        let mut providers: Vec<Box<dyn CredentialProvider>> = vec![Box::new(EnvCredentials::new(var))];
        if let Some(file) = credentials.and_then(|c| c.token_file.as_deref()) {
            providers.push(Box::new(FileCredentials::new(expand_env_vars(file))));
        }
        ChainedCredentials::new(providers)
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".warden").join("config.toml"))
}
