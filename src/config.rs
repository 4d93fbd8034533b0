//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use axum_extra::extract::cookie::SameSite;
use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 5000)
    pub port: u16,
    /// Origin of the shop frontend (e.g., "https://shop.example.com")
    ///
    /// Used as the only CORS-allowed origin and as the base for
    /// relative redirect targets.
    pub frontend_url: String,
    /// Directory holding the frontend's static assets
    pub frontend_dir: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 86400 = 24h)
    pub session_max_age: i64,
    /// Refuse to start without provider credentials
    pub require_credentials: bool,
    pub cookie: CookieConfig,
    pub redirects: RedirectConfig,
    pub google: GoogleOAuthConfig,
}

/// Session cookie attributes
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub same_site: SameSitePolicy,
    /// Explicit `Secure` flag; derived from the frontend URL when unset
    pub secure: Option<bool>,
}

/// SameSite attribute for the session cookie
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    #[default]
    Lax,
    Strict,
    /// Required for cross-site HTTPS deployments; implies `Secure`
    None,
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Where the browser lands after each auth transition
#[derive(Debug, Clone, Deserialize)]
pub struct RedirectConfig {
    pub success: String,
    pub failure: String,
    pub logout: String,
}

/// Google OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Must match the redirect URI registered with Google exactly
    pub callback_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Catalog source
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON file with an array of products; the built-in list is used when unset
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        let level = self.level.trim().to_ascii_lowercase();
        format!("shopfront={level},tower_http={level}")
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Mount the Prometheus `/metrics` endpoint
    pub enabled: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SHOPFRONT__*)
    ///
    /// The result is not validated yet: call [`AppConfig::validate`] once
    /// logging is up so its warnings are not lost. [`crate::AppState::new`]
    /// does this.
    ///
    /// # Errors
    /// Returns error if a source cannot be read or does not deserialize
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("server.frontend_url", "http://localhost:5000")?
            .set_default("server.frontend_dir", "frontend")?
            .set_default("auth.session_max_age", 86400)?
            .set_default("auth.require_credentials", true)?
            .set_default("auth.cookie.name", "shopfront.sid")?
            .set_default("auth.cookie.same_site", "lax")?
            .set_default("auth.redirects.success", "/shop.html")?
            .set_default("auth.redirects.failure", "/shop.html")?
            .set_default("auth.redirects.logout", "/shop.html")?
            .set_default(
                "auth.google.callback_url",
                "http://localhost:5000/auth/google/callback",
            )?
            .set_default(
                "auth.google.auth_url",
                "https://accounts.google.com/o/oauth2/v2/auth",
            )?
            .set_default("auth.google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default(
                "auth.google.userinfo_url",
                "https://www.googleapis.com/oauth2/v3/userinfo",
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("metrics.enabled", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SHOPFRONT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    /// Whether cookies must carry the `Secure` attribute
    pub fn should_use_secure_cookies(&self) -> bool {
        match self.auth.cookie.secure {
            Some(secure) => secure,
            None => self
                .server
                .frontend_url
                .trim()
                .to_ascii_lowercase()
                .starts_with("https://"),
        }
    }

    /// Resolve a configured redirect target against the frontend origin
    ///
    /// Absolute targets are returned untouched; relative ones are joined
    /// onto `server.frontend_url`.
    pub fn redirect_target(&self, target: &str) -> String {
        if Url::parse(target).is_ok() {
            return target.to_string();
        }

        match Url::parse(&self.server.frontend_url).and_then(|base| base.join(target)) {
            Ok(url) => url.to_string(),
            Err(error) => {
                tracing::warn!(%error, target, "Failed to resolve redirect target; using it as-is");
                target.to_string()
            }
        }
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;
        const MAX_SESSION_MAX_AGE_SECS: i64 = 365 * 24 * 60 * 60;
        const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_max_age > MAX_SESSION_MAX_AGE_SECS {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_max_age must not exceed {} seconds",
                MAX_SESSION_MAX_AGE_SECS
            )));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(crate::error::AppError::Config(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Url::parse(&self.server.frontend_url).map_err(|e| {
            crate::error::AppError::Config(format!("server.frontend_url is not a valid URL: {e}"))
        })?;

        Url::parse(&self.auth.google.callback_url).map_err(|e| {
            crate::error::AppError::Config(format!(
                "auth.google.callback_url is not a valid URL: {e}"
            ))
        })?;

        if self.auth.cookie.same_site == SameSitePolicy::None && !self.should_use_secure_cookies()
        {
            return Err(crate::error::AppError::Config(
                "auth.cookie.same_site=none requires secure cookies".to_string(),
            ));
        }

        let google = &self.auth.google;
        let missing_credentials =
            google.client_id.trim().is_empty() || google.client_secret.trim().is_empty();
        if missing_credentials {
            if self.auth.require_credentials {
                return Err(crate::error::AppError::Config(
                    "auth.google.client_id and auth.google.client_secret are required".to_string(),
                ));
            }
            tracing::warn!(
                "Google OAuth credentials are missing; sign-in will be rejected by the provider"
            );
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                frontend_url = %self.server.frontend_url,
                "Using insecure session cookies for local development"
            );
        }

        Ok(())
    }
}
