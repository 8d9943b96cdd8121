//! GitHub OAuth and REST API client
//!
//! Wraps one shared `reqwest::Client`. Every call is bounded by the
//! configured timeout and is never retried.

use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::profile::UserProfile;
use crate::config::GitHubOAuthConfig;
use crate::error::AppError;
use crate::metrics::record_upstream;

/// Access token returned by the code exchange
///
/// Only used for the user-info calls of the same request.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Successful token exchange response
#[derive(Debug, Deserialize)]
struct GitHubTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// OAuth error body. GitHub sends these with HTTP 200.
#[derive(Debug, Deserialize)]
struct GitHubTokenError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenExchangeResponse {
    Granted(GitHubTokenResponse),
    Denied(GitHubTokenError),
}

/// `GET /user` payload
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Null or empty when the user keeps their email private
    #[serde(default)]
    pub email: Option<String>,
    pub avatar_url: String,
}

/// `GET /user/emails` entry
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

/// Client for the GitHub endpoints used by the login flow
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubOAuthConfig,
    redirect_uri: String,
}

impl GitHubClient {
    /// Create a client
    ///
    /// # Arguments
    /// * `config` - GitHub endpoints and credentials
    /// * `redirect_uri` - Callback URL registered with the OAuth app
    pub fn new(config: &GitHubOAuthConfig, redirect_uri: String) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            config: config.clone(),
            redirect_uri,
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Build the authorization URL the browser is sent to
    pub fn authorization_url(&self, state: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AppError::Config(format!("github.authorize_url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    /// `AppError::Exchange` on transport errors, timeouts, non-success
    /// statuses, OAuth error bodies and undecodable responses
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, AppError> {
        let started = Instant::now();
        let result = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_upstream("token", transport_label(&e), started.elapsed());
                return Err(AppError::Exchange(e.to_string()));
            }
        };

        let status = response.status();
        record_upstream("token", status.as_str(), started.elapsed());

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Exchange(e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::Exchange(format!("{status}: {body}")));
        }

        match serde_json::from_str::<TokenExchangeResponse>(&body) {
            Ok(TokenExchangeResponse::Granted(token)) if token.access_token.trim().is_empty() => {
                Err(AppError::Exchange("empty access token".to_string()))
            }
            Ok(TokenExchangeResponse::Granted(token)) => {
                tracing::debug!(
                    token_type = ?token.token_type,
                    scope = ?token.scope,
                    "Authorization code exchanged"
                );
                Ok(AccessToken(token.access_token))
            }
            Ok(TokenExchangeResponse::Denied(error)) => Err(AppError::Exchange(
                match error.error_description {
                    Some(description) => format!("{}: {}", error.error, description),
                    None => error.error,
                },
            )),
            Err(e) => Err(AppError::Exchange(format!("unexpected response: {e}"))),
        }
    }

    /// Fetch the authenticated user
    pub async fn fetch_user(&self, token: &AccessToken) -> Result<GitHubUser, AppError> {
        self.get_json("user", "/user", token).await
    }

    /// Fetch the account's primary, verified email
    ///
    /// # Errors
    /// `AppError::NoVerifiedEmail` if no entry is both primary and verified.
    /// Unverified or secondary addresses are never used.
    pub async fn fetch_primary_email(&self, token: &AccessToken) -> Result<String, AppError> {
        let emails: Vec<GitHubEmail> = self.get_json("emails", "/user/emails", token).await?;
        select_primary_email(emails).ok_or(AppError::NoVerifiedEmail)
    }

    /// Fetch the user and resolve a usable email
    ///
    /// The emails endpoint is only called when the profile email is private.
    pub async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, AppError> {
        let user = self.fetch_user(token).await?;

        let public_email = user
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(ToOwned::to_owned);

        let email = match public_email {
            Some(email) => email,
            None => {
                tracing::debug!(login = %user.login, "Profile email is private, querying emails");
                self.fetch_primary_email(token).await?
            }
        };

        Ok(UserProfile::from_github(user, email))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        token: &AccessToken,
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);

        let started = Instant::now();
        let result = self
            .http
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_upstream(endpoint, transport_label(&e), started.elapsed());
                return Err(AppError::ProfileFetch(e.to_string()));
            }
        };

        let status = response.status();
        record_upstream(endpoint, status.as_str(), started.elapsed());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProfileFetch(format!("{path}: {status}: {body}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::ProfileFetch(e.to_string()))?;
        serde_json::from_slice(&body)
            .map_err(|e| AppError::ProfileFetch(format!("{path}: malformed response: {e}")))
    }
}

/// Pick the first entry that is both primary and verified
pub fn select_primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|entry| entry.primary && entry.verified)
        .map(|entry| entry.email)
}

fn transport_label(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else {
        "error"
    }
}
