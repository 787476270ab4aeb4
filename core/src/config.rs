//! Client configuration.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file,
//! environment variables. Binaries layer their own flags on top.
//!
//! ```toml
//! base_url = "http://localhost:8000/api"
//! csrf_cookie_name = "csrftoken"
//! csrf_header_name = "X-CSRFToken"
//! timeout_secs = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_API_URL: &str = "AGENDA_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "AGENDA_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Backend root including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_cookie_name")]
    pub csrf_cookie_name: String,

    #[serde(default = "default_header_name")]
    pub csrf_header_name: String,

    /// Unset means the transport's own default applies.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_cookie_name() -> String {
    "csrftoken".to_string()
}

fn default_header_name() -> String {
    "X-CSRFToken".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            csrf_cookie_name: default_cookie_name(),
            csrf_header_name: default_header_name(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("failed to parse {path}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ClientConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// `$XDG_CONFIG_HOME/agenda/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agenda").join("config.toml"))
    }

    /// Resolve configuration the way the binaries do: explicit file if
    /// given, else the default file when it exists, else defaults; then
    /// environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `AGENDA_*` overrides. `lookup` is injectable so tests do not
    /// touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
