//! Session tokens
//!
//! Uses HMAC-signed tokens handed to the frontend.
//! No server-side session storage needed.
//!
//! Tokens are compact JWS values (`header.payload.signature`, base64url
//! without padding, HS256) so any standard JWT library holding the shared
//! secret can verify them. A consumer must:
//! 1. check the header is `{"alg":"HS256","typ":"JWT"}`
//! 2. check the HMAC-SHA256 of `header.payload` in constant time
//! 3. reject tokens whose `exp` is in the past
//! 4. check `iss` names this login service

use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::profile::UserProfile;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Provider user ID
    pub sub: String,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub provider: String,
    /// Public URL of the issuing service
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl SessionClaims {
    /// Build claims for a freshly authenticated user
    ///
    /// # Arguments
    /// * `profile` - Authenticated user
    /// * `issuer` - Public URL of this service
    /// * `max_age` - Token lifetime in seconds
    ///
    /// # Errors
    /// Returns `AppError::TokenMint` if the expiry is not representable
    pub fn new(profile: &UserProfile, issuer: &str, max_age: i64) -> Result<Self, AppError> {
        let now = Utc::now();
        let expires_at = Duration::try_seconds(max_age)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::TokenMint(format!("session lifetime of {max_age}s is out of range"))
            })?;

        Ok(Self {
            sub: profile.id.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            provider: profile.provider.clone(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

const ALGORITHM: &str = "HS256";
const TOKEN_TYPE: &str = "JWT";

/// Create a signed session token
///
/// Token format: base64(header).base64(claims).base64(hmac_sha256(header.claims))
///
/// # Arguments
/// * `claims` - Claims to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(claims: &SessionClaims, secret: &str) -> Result<String, AppError> {
    // 1. Encode header and claims
    let header = TokenHeader {
        alg: ALGORITHM.to_string(),
        typ: TOKEN_TYPE.to_string(),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| AppError::TokenMint(e.to_string()))?;
    let claims_json =
        serde_json::to_vec(claims).map_err(|e| AppError::TokenMint(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(header_json),
        general_purpose::URL_SAFE_NO_PAD.encode(claims_json)
    );

    // 2. Sign
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::TokenMint(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    // 3. Return "{header}.{claims}.{signature}"
    Ok(format!(
        "{}.{}",
        signing_input,
        general_purpose::URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
/// * `issuer` - Public URL of this service, compared against `iss`
///
/// # Errors
/// Returns `AppError::Unauthorized` if the token is malformed, signed
/// with another key or algorithm, issued by someone else, or expired
pub fn verify_session_token(
    token: &str,
    secret: &str,
    issuer: &str,
) -> Result<SessionClaims, AppError> {
    // 1. Split token into header, claims and signature
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized);
    };

    // 2. Only HS256 JWTs are accepted
    let header: TokenHeader = decode_segment(header_b64)?;
    if header.alg != ALGORITHM || header.typ != TOKEN_TYPE {
        return Err(AppError::Unauthorized);
    }

    // 3. Verify HMAC signature
    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session secret: {e}")))?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    // 4. Decode claims, check issuer and expiry
    let claims: SessionClaims = decode_segment(claims_b64)?;
    if claims.iss != issuer || claims.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AppError> {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AppError::Unauthorized)?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::Unauthorized)
}
