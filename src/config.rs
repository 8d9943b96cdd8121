//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)
//!
//! The resulting `AppConfig` is immutable for the lifetime of the process.

use serde::Deserialize;
use std::{net::IpAddr, path::Path};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubOAuthConfig,
    pub frontend: FrontendConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public base URL registered with GitHub (e.g., "https://login.example.com")
    pub public_url: String,
    /// Mark cookies `Secure`. Only disable for plain-HTTP local development.
    pub secure_cookies: bool,
}

impl ServerConfig {
    /// OAuth callback URL registered with GitHub
    ///
    /// # Returns
    /// Full URL like "https://login.example.com/auth/github/callback"
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/github/callback", self.issuer())
    }

    /// Issuer claim of minted session tokens
    pub fn issuer(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Requested scopes (default: read:user, user:email)
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    /// REST API base, without trailing slash
    pub api_url: String,
    /// Per-request timeout for every outbound call
    pub request_timeout_seconds: u64,
    /// GitHub rejects API requests without a User-Agent
    pub user_agent: String,
}

/// Frontend that receives the session token
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// e.g., "http://localhost:5500"
    pub url: String,
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC secret key (32+ bytes)
    pub secret: String,
    /// Token lifetime in seconds (default: 86400 = 1 day)
    pub max_age: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `config/` and the environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GITHUB_LOGIN__*)
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        Self::load_from(Path::new("config"))
    }

    /// Load configuration with files read from `dir`
    pub fn load_from(dir: &Path) -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.secure_cookies", true)?
            .set_default("github.scopes", vec!["read:user", "user:email"])?
            .set_default(
                "github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("github.api_url", "https://api.github.com")?
            .set_default("github.request_timeout_seconds", 10)?
            .set_default(
                "github.user_agent",
                concat!("github-login/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("session.max_age", 86400)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join("local")).required(false))
            .add_source(
                Environment::with_prefix("GITHUB_LOGIN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("github.scopes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        const MIN_SESSION_SECRET_BYTES: usize = 32;
        const MAX_SESSION_MAX_AGE: i64 = 365 * 24 * 60 * 60;

        if self.github.client_id.trim().is_empty() || self.github.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_id and github.client_secret must be set".to_string(),
            ));
        }

        if self.session.secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "session.secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.session.max_age <= 0 || self.session.max_age > MAX_SESSION_MAX_AGE {
            return Err(AppError::Config(format!(
                "session.max_age must be between 1 and {} seconds",
                MAX_SESSION_MAX_AGE
            )));
        }

        if self.github.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "github.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for (key, value) in [
            ("server.public_url", &self.server.public_url),
            ("frontend.url", &self.frontend.url),
            ("github.authorize_url", &self.github.authorize_url),
            ("github.token_url", &self.github.token_url),
            ("github.api_url", &self.github.api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        if !self.server.secure_cookies {
            let host = public_host(&self.server.public_url);
            if !is_local_host(&host) {
                return Err(AppError::Config(
                    "server.secure_cookies may only be disabled for localhost public URLs"
                        .to_string(),
                ));
            }
            tracing::warn!(
                host = %host,
                "Using insecure cookies for local development"
            );
        }

        Ok(())
    }
}

fn public_host(public_url: &str) -> String {
    url::Url::parse(public_url.trim())
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()))
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_local_host(host: &str) -> bool {
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
