//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, endpoint paths, the session sealing
//! secret and the last used username.
//!
//! Configuration is stored at `~/.config/sessiongate/config.json`. The
//! `SESSIONGATE_API_URL` and `SESSIONGATE_SECRET` environment variables take
//! precedence over the file and are never written back to it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const ENV_API_URL: &str = "SESSIONGATE_API_URL";

/// Environment variable overriding the session sealing secret
pub const ENV_SECRET: &str = "SESSIONGATE_SECRET";

/// Default HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Paths of the external API endpoints, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub sign_in: String,
    pub sign_up: String,
    pub refresh: String,
    /// The deployed backend serves the profile from the sign-in route.
    pub profile: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sign_in: "/api/auth/sign-in".to_string(),
            sign_up: "/api/auth/sign-up".to_string(),
            refresh: "/career-coaching/home-page".to_string(),
            profile: "/api/auth/sign-in".to_string(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub session_secret: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
    pub last_username: Option<String>,

    #[serde(skip)]
    api_base_url_override: Option<String>,
    #[serde(skip)]
    session_secret_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            session_secret: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            endpoints: Endpoints::default(),
            last_username: None,
            api_base_url_override: None,
            session_secret_override: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Build a config pointing at `base_url`, ignoring file and environment.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        self.api_base_url_override = std::env::var(ENV_API_URL).ok().filter(|v| !v.is_empty());
        self.session_secret_override = std::env::var(ENV_SECRET).ok().filter(|v| !v.is_empty());
    }

    /// Base URL of the external API, without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        self.api_base_url_override
            .as_deref()
            .or(self.api_base_url.as_deref())
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                anyhow::anyhow!("API base URL is not configured (set {} or api_base_url)", ENV_API_URL)
            })
    }

    /// Secret used to seal the persisted session token.
    pub fn session_secret(&self) -> Result<SecretString> {
        self.session_secret_override
            .as_deref()
            .or(self.session_secret.as_deref())
            .map(|secret| SecretString::from(secret.to_string()))
            .ok_or_else(|| {
                anyhow::anyhow!("Session secret is not configured (set {} or session_secret)", ENV_SECRET)
            })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = Config::with_base_url("https://api.example.com/");
        assert_eq!(config.base_url().unwrap(), "https://api.example.com");
    }

    #[test]
    fn test_missing_base_url_is_an_error() {
        let err = Config::default().base_url().unwrap_err();
        assert!(err.to_string().contains(ENV_API_URL));
    }

    #[test]
    fn test_file_values_fill_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_base_url": "http://localhost:8000", "session_secret": "s3cret"}"#)
                .unwrap();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.session_secret().unwrap().expose_secret(), "s3cret");
    }

    #[test]
    fn test_overrides_are_not_serialized() {
        let mut config = Config::with_base_url("http://file");
        config.api_base_url_override = Some("http://env".to_string());
        assert_eq!(config.base_url().unwrap(), "http://env");

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("http://env"));
    }
}
