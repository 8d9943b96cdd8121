//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use url::Url;

use super::middleware::CurrentUser;
use super::session::{SessionClaims, create_session_token};
use super::state::{clear_state_cookie, generate_state, state_cookie, verify_state};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::{CALLBACKS_TOTAL, LOGIN_REDIRECTS_TOTAL};

/// Create authentication router
///
/// Routes:
/// - GET /auth/github - Redirect to GitHub
/// - GET /auth/github/callback - OAuth callback
/// - GET /auth/me - Claims of the presented session token
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/github", get(github_redirect))
        .route("/auth/github/callback", get(github_callback))
        .route("/auth/me", get(current_session))
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github
///
/// Redirects user to GitHub authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to GitHub with client_id, redirect_uri, scope, state
async fn github_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let csrf_state = generate_state()?;
    let authorize_url = state.github.authorization_url(&csrf_state)?;
    let jar = jar.add(state_cookie(csrf_state, state.config.server.secure_cookies));

    LOGIN_REDIRECTS_TOTAL.inc();
    tracing::info!(redirect_uri = %state.github.redirect_uri(), "Redirecting to GitHub");

    Ok((jar, Redirect::temporary(authorize_url.as_str())))
}

/// Query parameters from GitHub callback
///
/// Everything is optional so that a missing `state` is reported as an
/// invalid state rather than a generic query rejection.
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set by GitHub when the user denies access
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /auth/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch user info (and private email) from GitHub
/// 4. Mint session token
/// 5. Clear state cookie and redirect to frontend with the token
async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<GitHubCallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let result = complete_login(&state, query, &jar).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(error) => error.error_type(),
    };
    CALLBACKS_TOTAL.with_label_values(&[outcome]).inc();

    let redirect = result?;
    Ok((clear_state_cookie(jar), redirect))
}

async fn complete_login(
    state: &AppState,
    query: GitHubCallbackQuery,
    jar: &CookieJar,
) -> Result<Redirect, AppError> {
    verify_state(query.state.as_deref(), jar)?;

    if let Some(error) = query.error {
        return Err(AppError::Exchange(match query.error_description {
            Some(description) => format!("authorization denied: {error}: {description}"),
            None => format!("authorization denied: {error}"),
        }));
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Exchange("missing authorization code".to_string()))?;

    let access_token = state.github.exchange_code(&code).await?;
    let profile = state.github.fetch_profile(&access_token).await?;

    tracing::info!(
        github_id = %profile.id,
        name = %profile.name,
        "GitHub user authenticated"
    );

    let claims = SessionClaims::new(
        &profile,
        state.config.server.issuer(),
        state.config.session.max_age,
    )?;
    let session_token = create_session_token(&claims, &state.config.session.secret)?;
    let location = frontend_redirect_url(&state.config.frontend.url, &session_token)?;

    Ok(Redirect::temporary(location.as_str()))
}

/// Append `token` to the frontend URL, keeping its existing query
fn frontend_redirect_url(frontend_url: &str, token: &str) -> Result<Url, AppError> {
    let mut url = Url::parse(frontend_url)
        .map_err(|e| AppError::Config(format!("frontend.url: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

// =============================================================================
// Session
// =============================================================================

/// GET /auth/me
///
/// Returns the verified claims of the bearer session token.
async fn current_session(CurrentUser(claims): CurrentUser) -> Json<SessionClaims> {
    Json(claims)
}
