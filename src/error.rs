//! Error types for github-login
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Only `InvalidState` and `Unauthorized` are caller mistakes. Every
/// upstream-facing failure is reported as a server error, since the
/// user can do nothing but restart the login flow.
#[derive(Debug, Error)]
pub enum AppError {
    /// Anti-forgery state missing or mismatched (400)
    #[error("Invalid state parameter")]
    InvalidState,

    /// Session token missing or invalid (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Authorization code exchange failed (500)
    #[error("Failed to exchange token: {0}")]
    Exchange(String),

    /// User profile or email lookup failed (500)
    #[error("Failed to get user info: {0}")]
    ProfileFetch(String),

    /// No primary, verified email on the account (500)
    #[error("Failed to get user info: no verified primary email found")]
    NoVerifiedEmail,

    /// Session token could not be signed (500)
    #[error("Failed to generate token: {0}")]
    TokenMint(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidState => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Exchange(_)
            | AppError::ProfileFetch(_)
            | AppError::NoVerifiedEmail
            | AppError::TokenMint(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and logs
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidState => "invalid_state",
            AppError::Unauthorized => "unauthorized",
            AppError::Exchange(_) => "exchange",
            AppError::ProfileFetch(_) => "profile_fetch",
            AppError::NoVerifiedEmail => "no_verified_email",
            AppError::TokenMint(_) => "token_mint",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Upstream failure reasons are surfaced to the caller; internal
    /// errors are logged but replaced by a generic message.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status_code();
        let error_type = self.error_type();
        let error_message = match &self {
            AppError::Internal(_) | AppError::Config(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::warn!(error = %self, error_type, "Request rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
