//! github-login - "Login with GitHub" for a separate frontend
//!
//! # Flow
//!
//! ```text
//! browser ── GET /auth/github ──────────► 307 github.com/login/oauth/authorize
//!                                          (+ oauthstate cookie)
//! browser ── GET /auth/github/callback ─► verify state
//!                                          ├─ POST  token endpoint
//!                                          ├─ GET   /user
//!                                          ├─ GET   /user/emails (private email only)
//!                                          └─ sign session token
//!         ◄─ 307 <frontend>?token=<session token>
//! ```
//!
//! # Modules
//!
//! - `auth`: OAuth flow, GitHub client, session tokens
//! - `api`: Operational endpoints (metrics)
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Immutable after startup; cloned for each request.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// GitHub OAuth/API client
    pub github: Arc<auth::GitHubClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let github = auth::GitHubClient::new(&config.github, config.server.redirect_uri())?;

        Ok(Self {
            config: Arc::new(config),
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    let cors_layer = build_cors_layer(&state.config.frontend);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

/// Allow the frontend origin to call `/auth/me` with its bearer token
fn build_cors_layer(frontend: &config::FrontendConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let origin = url::Url::parse(&frontend.url)
        .ok()
        .map(|url| url.origin().ascii_serialization());

    match origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods([Method::GET])
            .allow_headers([header::AUTHORIZATION]),
        _ => {
            tracing::error!(
                frontend = %frontend.url,
                "Failed to derive CORS origin from frontend URL; denying cross-origin requests"
            );
            CorsLayer::new()
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
