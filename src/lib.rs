//! Shopfront - a small storefront backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Router (Axum)                      │
//! │  - /api/products, /api/auth/status                          │
//! │  - /auth/{provider}, /auth/{provider}/callback, /logout     │
//! │  - static frontend files                                    │
//! └─────────────────────────────────────────────────────────────┘
//!            │                    │                    │
//! ┌──────────────────┐ ┌────────────────────┐ ┌─────────────────┐
//! │  Catalog store   │ │   Session store    │ │ OAuth delegate  │
//! │  (in memory)     │ │ (in memory, signed │ │ (Google)        │
//! │                  │ │  cookie)           │ │                 │
//! └──────────────────┘ └────────────────────┘ └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: JSON handlers for the frontend
//! - `auth`: OAuth sign-in and sessions
//! - `data`: Product catalog
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Identity provider used for sign-in
    pub provider: Arc<dyn auth::IdentityProvider>,

    /// Server-side sessions
    pub sessions: Arc<dyn auth::SessionStore>,

    /// Product catalog (read-only)
    pub catalog: data::Catalog,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Validate configuration
    /// 2. Load the product catalog
    /// 3. Build the HTTP client and Google provider
    /// 4. Create the in-memory session store
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, the catalog cannot be
    /// loaded or the HTTP client cannot be built. Any of these is fatal: the
    /// server must not start.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Validate configuration
        config.validate()?;

        // 2. Load catalog
        let catalog = data::Catalog::load(config.catalog.path.as_deref())?;

        // 3. Initialize HTTP client and identity provider
        let http_client = reqwest::Client::builder()
            .user_agent("Shopfront/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;
        let provider = Arc::new(auth::GoogleProvider::new(
            config.auth.google.clone(),
            http_client,
        ));

        // 4. Initialize session store
        let ttl = chrono::Duration::try_seconds(config.auth.session_max_age).ok_or_else(|| {
            error::AppError::Config("auth.session_max_age is out of range".to_string())
        })?;
        let sessions = Arc::new(auth::InMemorySessionStore::new(ttl));

        tracing::info!("Application state initialized successfully");

        Ok(Self::from_parts(config, provider, sessions, catalog))
    }

    /// Assemble state from explicit components
    ///
    /// Lets callers swap the identity provider or session store.
    pub fn from_parts(
        config: config::AppConfig,
        provider: Arc<dyn auth::IdentityProvider>,
        sessions: Arc<dyn auth::SessionStore>,
        catalog: data::Catalog,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            sessions,
            catalog,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);
    let frontend_dir = state.config.server.frontend_dir.clone();
    let metrics_enabled = state.config.metrics.enabled;

    let router = Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(state.provider.name()))
        .nest("/api", api::api_router())
        .nest_service("/images", ServeDir::new(frontend_dir.join("images")))
        .fallback_service(ServeDir::new(frontend_dir))
        .layer(axum::middleware::from_fn(api::track_http_metrics))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state);

    if metrics_enabled {
        router.merge(api::metrics_router())
    } else {
        router
    }
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    // Credentialed CORS forbids wildcards, so methods and headers are listed.
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let allowed_origin = server.frontend_url.trim().trim_end_matches('/');
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => base.allow_origin(origin).allow_credentials(true),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from frontend URL; denying cross-origin requests"
            );
            base
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
