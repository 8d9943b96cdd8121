//! Anti-forgery state for the OAuth round trip
//!
//! A fresh random value is stored in the `oauthstate` cookie and sent to
//! GitHub as the `state` parameter. GitHub echoes it back on the callback,
//! where both copies must match before the code is exchanged.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::AppError;

/// Cookie carrying the state between login and callback
pub const STATE_COOKIE_NAME: &str = "oauthstate";

/// Cookie lifetime in seconds
pub const STATE_COOKIE_MAX_AGE: i64 = 3600;

/// Random bytes per state value (encodes to 43 characters)
const STATE_BYTES: usize = 32;

/// Generate a random, URL-safe state value
///
/// # Errors
/// Fails if the OS randomness source is unavailable. Callers must abort
/// rather than fall back to a predictable value.
pub fn generate_state() -> Result<String, AppError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("randomness source failed: {e}")))?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Build the state cookie
pub fn state_cookie(state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state))
        .path("/")
        .max_age(time::Duration::seconds(STATE_COOKIE_MAX_AGE))
        .http_only(true)
        .secure(secure)
        // Lax still sends the cookie on the top-level redirect back from GitHub
        .same_site(SameSite::Lax)
        .build()
}

/// Verify the callback `state` against the cookie
///
/// # Errors
/// Returns `AppError::InvalidState` if either side is missing or they differ
pub fn verify_state(query_state: Option<&str>, jar: &CookieJar) -> Result<(), AppError> {
    let expected = jar
        .get(STATE_COOKIE_NAME)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or(AppError::InvalidState)?;
    let received = query_state
        .filter(|value| !value.is_empty())
        .ok_or(AppError::InvalidState)?;

    if constant_time_eq(expected.as_bytes(), received.as_bytes()) {
        Ok(())
    } else {
        Err(AppError::InvalidState)
    }
}

/// Remove the state cookie once it has been consumed
pub fn clear_state_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(STATE_COOKIE_NAME).path("/"))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
