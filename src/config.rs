//! Client configuration loaded from environment variables.
//!
//! The API base URL is chosen once at startup from `CAREBOOK_ENV`, which
//! selects between the development and production endpoints.

use crate::services::refresh::RefreshPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

const DEFAULT_DEV_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_PROD_API_URL: &str = "https://api.carebook.health/api";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Build environment selecting the API endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildEnv {
    #[default]
    Development,
    Production,
}

impl FromStr for BuildEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(BuildEnv::Development),
            "production" | "prod" => Ok(BuildEnv::Production),
            _ => Err(ConfigError::Invalid("CAREBOOK_ENV", s.to_string())),
        }
    }
}

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Which of the two API endpoints requests go to
    pub build_env: BuildEnv,
    /// Development API base URL
    #[validate(url)]
    pub dev_api_url: String,
    /// Production API base URL
    #[validate(url)]
    pub prod_api_url: String,
    /// Where the host sends the user when the session expires
    #[validate(length(min = 1))]
    pub login_path: String,
    /// Credentials file for the persisted store
    pub credentials_path: PathBuf,
    /// Transport timeout for every request, refresh included
    pub http_timeout: Duration,
    /// How concurrent 401s share refresh calls
    pub refresh_policy: RefreshPolicy,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            build_env: BuildEnv::Development,
            dev_api_url: DEFAULT_DEV_API_URL.to_string(),
            prod_api_url: DEFAULT_PROD_API_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            credentials_path: PathBuf::from(".carebook/credentials.json"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let build_env = match lookup("CAREBOOK_ENV") {
            Some(v) => v.parse()?,
            None => BuildEnv::default(),
        };

        let refresh_policy = match lookup("CAREBOOK_REFRESH_POLICY") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("CAREBOOK_REFRESH_POLICY", v))?,
            None => RefreshPolicy::default(),
        };

        let http_timeout = match lookup("CAREBOOK_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid("CAREBOOK_HTTP_TIMEOUT_SECS", v))?,
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let credentials_path = lookup("CAREBOOK_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
                PathBuf::from(home).join(".carebook").join("credentials.json")
            });

        let config = Self {
            build_env,
            dev_api_url: lookup("CAREBOOK_DEV_API_URL")
                .unwrap_or_else(|| DEFAULT_DEV_API_URL.to_string()),
            prod_api_url: lookup("CAREBOOK_PROD_API_URL")
                .unwrap_or_else(|| DEFAULT_PROD_API_URL.to_string()),
            login_path: lookup("CAREBOOK_LOGIN_PATH")
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            credentials_path,
            http_timeout,
            refresh_policy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Base URL for the selected build environment, without trailing slash.
    pub fn api_base_url(&self) -> &str {
        let url = match self.build_env {
            BuildEnv::Development => &self.dev_api_url,
            BuildEnv::Production => &self.prod_api_url,
        };
        url.trim_end_matches('/')
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
