//! GitHub OAuth authentication
//!
//! Handles:
//! - Anti-forgery state cookie
//! - GitHub code exchange and profile lookup
//! - Signed session tokens

pub mod github;
mod middleware;
mod oauth;
pub mod profile;
pub mod session;
pub mod state;

pub use github::{AccessToken, GitHubClient};
pub use middleware::CurrentUser;
pub use oauth::auth_router;
pub use profile::UserProfile;
pub use session::{SessionClaims, create_session_token, verify_session_token};
