//! Common test utilities for E2E tests

#![allow(dead_code)]

use github_login::{AppState, config};
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const CLIENT_ID: &str = "test-client-id";
pub const FRONTEND_URL: &str = "https://app.test.example.com/";
pub const PUBLIC_URL: &str = "https://login.test.example.com";

/// Test server instance
///
/// Runs the real router on an ephemeral port, with every GitHub endpoint
/// pointed at `github`.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let github = MockServer::start().await;

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                public_url: PUBLIC_URL.to_string(),
                secure_cookies: true,
            },
            github: config::GitHubOAuthConfig {
                client_id: CLIENT_ID.to_string(),
                client_secret: "test-client-secret".to_string(),
                scopes: vec!["read:user".to_string(), "user:email".to_string()],
                authorize_url: format!("{}/login/oauth/authorize", github.uri()),
                token_url: format!("{}/login/oauth/access_token", github.uri()),
                api_url: github.uri(),
                request_timeout_seconds: 1,
                user_agent: "github-login-e2e".to_string(),
            },
            frontend: config::FrontendConfig {
                url: FRONTEND_URL.to_string(),
            },
            session: config::SessionConfig {
                secret: "test-secret-key-32-bytes-long!!!".to_string(),
                max_age: 3600,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Redirects must be observed, not followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        github_login::metrics::init_metrics();
        let app = github_login::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Start a login and return the state stored in the cookie
    pub async fn begin_login(&self) -> String {
        let response = self
            .client
            .get(self.url("/auth/github"))
            .send()
            .await
            .expect("login request succeeds");
        let set_cookie = response
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .expect("set-cookie header");
        cookie_value(set_cookie, "oauthstate").expect("oauthstate cookie")
    }

    /// Call the callback carrying `cookie_state` in the oauthstate cookie
    pub async fn callback(&self, query: &str, cookie_state: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .get(self.url(&format!("/auth/github/callback?{query}")));
        if let Some(value) = cookie_state {
            request = request.header("Cookie", format!("oauthstate={value}"));
        }
        request.send().await.expect("callback request succeeds")
    }
}

/// Read a cookie value from a Set-Cookie header
pub fn cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.trim().strip_prefix(&format!("{name}=")))
        .map(ToOwned::to_owned)
}

/// Read a query parameter from a URL
pub fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
