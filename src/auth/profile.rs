//! Normalized user profile

use serde::{Deserialize, Serialize};

use super::github::GitHubUser;

/// Provider tag carried by every profile and session token
pub const GITHUB_PROVIDER: &str = "github";

/// Provider-independent view of an authenticated user
///
/// Lives only for the duration of one callback request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider user ID, stringified
    pub id: String,
    /// Primary verified email
    pub email: String,
    /// Display name
    pub name: String,
    pub avatar_url: String,
    pub provider: String,
}

impl UserProfile {
    /// Build a profile from a GitHub user and its resolved email
    ///
    /// Falls back to the login when the account has no display name.
    pub fn from_github(user: GitHubUser, email: String) -> Self {
        let name = user
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(user.login);

        Self {
            id: user.id.to_string(),
            email,
            name,
            avatar_url: user.avatar_url,
            provider: GITHUB_PROVIDER.to_string(),
        }
    }
}
