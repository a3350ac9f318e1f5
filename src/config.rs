//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Development default values.
pub mod defaults {
    pub const DEV_BACKEND_URL: &str = "http://127.0.0.1:8765";
    pub const DEV_CONNECT_TIMEOUT_SECS: u64 = 5;
    pub const DEV_REQUEST_TIMEOUT_SECS: u64 = 120; // Uploads carry whole video files
    pub const DEV_DRAFT_PATH: &str = "glass-drafts.json";
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Backend base URL without trailing slash
    pub backend_url: String,
    /// True when the backend URL came from the environment rather than defaults
    pub backend_url_explicit: bool,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Total per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// File backing the local draft store
    pub draft_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production, default: development)
    /// - `GLASS_BACKEND_URL`: Backend base URL (default: http://127.0.0.1:8765)
    /// - `GLASS_BACKEND_PORT`: Loopback port handed over by a desktop shell; overrides the URL
    /// - `GLASS_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 5)
    /// - `GLASS_REQUEST_TIMEOUT_SECS`: Request timeout (default: 120)
    /// - `GLASS_DRAFT_PATH`: Draft store file (default: glass-drafts.json)
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("RUST_ENV") {
            Ok(value) => Environment::parse(&value).ok_or(ConfigError::InvalidValue(
                "RUST_ENV must be 'development' or 'production'",
            ))?,
            Err(_) => Environment::Development,
        };

        let port = env::var("GLASS_BACKEND_PORT")
            .ok()
            .map(|p| {
                p.parse::<u16>().map_err(|_| {
                    ConfigError::InvalidValue("GLASS_BACKEND_PORT must be a valid port number")
                })
            })
            .transpose()?;

        let (backend_url, backend_url_explicit) = match (port, env::var("GLASS_BACKEND_URL")) {
            (Some(port), _) => (format!("http://127.0.0.1:{}", port), true),
            (None, Ok(url)) => (url, true),
            (None, Err(_)) => (defaults::DEV_BACKEND_URL.to_string(), false),
        };
        let backend_url = backend_url.trim_end_matches('/').to_string();

        let connect_timeout_secs = env::var("GLASS_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults::DEV_CONNECT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("GLASS_CONNECT_TIMEOUT_SECS must be a valid number")
            })?;

        let request_timeout_secs = env::var("GLASS_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| defaults::DEV_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("GLASS_REQUEST_TIMEOUT_SECS must be a valid number")
            })?;

        let draft_path = env::var("GLASS_DRAFT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DEV_DRAFT_PATH));

        let config = Config {
            environment,
            backend_url,
            backend_url_explicit,
            connect_timeout_secs,
            request_timeout_secs,
            draft_path,
        };

        config.validate()?;

        Ok(config)
    }

    /// Build a development configuration pointing at the given backend.
    pub fn for_backend(backend_url: impl Into<String>) -> Self {
        Config {
            environment: Environment::Development,
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            backend_url_explicit: true,
            connect_timeout_secs: defaults::DEV_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: defaults::DEV_REQUEST_TIMEOUT_SECS,
            draft_path: PathBuf::from(defaults::DEV_DRAFT_PATH),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            errors.push(format!(
                "GLASS_BACKEND_URL '{}' must start with http:// or https://",
                self.backend_url
            ));
        }

        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            errors.push("Timeouts must be greater than zero".to_string());
        }

        if self.environment.is_production() && !self.backend_url_explicit {
            errors.push(format!(
                "GLASS_BACKEND_URL is not set; refusing to use development default '{}' in production",
                defaults::DEV_BACKEND_URL
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        Ok(())
    }

    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}
