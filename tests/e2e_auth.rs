//! E2E tests for the GitHub login flow

mod common;

use common::{CLIENT_ID, FRONTEND_URL, TestServer, cookie_value, query_param};
use github_login::auth::verify_session_token;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_token_exchange(server: &TestServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "gho_e2e",
            "token_type": "bearer",
            "scope": "read:user,user:email"
        })))
        .expect(times)
        .mount(&server.github)
        .await;
}

async fn mount_user(server: &TestServer, email: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "login": "octocat",
            "id": 583231,
            "name": "The Octocat",
            "email": email,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231?v=4"
        })))
        .expect(times)
        .mount(&server.github)
        .await;
}

async fn mount_emails(server: &TestServer, emails: serde_json::Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(emails))
        .expect(times)
        .mount(&server.github)
        .await;
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

#[tokio::test]
async fn test_github_redirect_sets_state_cookie_and_redirects() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/github"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 307);
    let location = location(&response);
    assert!(location.starts_with(&format!("{}/login/oauth/authorize?", server.github.uri())));
    assert!(location.contains(&format!("client_id={CLIENT_ID}")));
    assert!(location.contains("scope=read%3Auser+user%3Aemail"));
    assert_eq!(
        query_param(&location, "redirect_uri").as_deref(),
        Some("https://login.test.example.com/auth/github/callback")
    );

    let state = query_param(&location, "state").expect("state parameter");
    assert!(state.len() >= 32, "state too short: {state}");

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert_eq!(cookie_value(set_cookie, "oauthstate"), Some(state));
}

#[tokio::test]
async fn test_each_login_gets_a_fresh_state() {
    let server = TestServer::new().await;

    let first = server.begin_login().await;
    let second = server.begin_login().await;

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_github_callback_rejects_missing_state_cookie() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 0).await;

    let response = server.callback("state=abc&code=xyz", None).await;

    assert_eq!(response.status(), 400);
    assert!(response.headers().get("location").is_none());
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Invalid state parameter");

    server.github.verify().await;
}

#[tokio::test]
async fn test_github_callback_rejects_mismatched_state() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 0).await;
    let state = server.begin_login().await;

    let response = server
        .callback(&format!("state={state}x&code=xyz"), Some(&state))
        .await;
    assert_eq!(response.status(), 400);

    let response = server.callback("code=xyz", Some(&state)).await;
    assert_eq!(response.status(), 400);

    server.github.verify().await;
}

#[tokio::test]
async fn test_successful_login_redirects_to_frontend_with_token() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 1).await;
    mount_user(&server, "octocat@github.com".into(), 1).await;
    mount_emails(&server, serde_json::json!([]), 0).await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=good-code"), Some(&state))
        .await;

    assert_eq!(response.status(), 307);
    let location = location(&response);
    assert!(location.starts_with(&format!("{FRONTEND_URL}?token=")));

    let cleared: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect();
    assert!(
        cleared
            .iter()
            .any(|v| v.starts_with("oauthstate=") && v.contains("Max-Age=0")),
        "expected state cookie removal, got: {cleared:?}"
    );

    let token = query_param(&location, "token").expect("token parameter");
    assert!(!token.is_empty());
    let claims = verify_session_token(
        &token,
        &server.state.config.session.secret,
        server.state.config.server.issuer(),
    )
    .expect("token verifies");
    assert_eq!(claims.sub, "583231");
    assert_eq!(claims.email, "octocat@github.com");
    assert_eq!(claims.name, "The Octocat");
    assert_eq!(claims.provider, "github");
    assert_eq!(claims.iss, "https://login.test.example.com");

    server.github.verify().await;
}

#[tokio::test]
async fn test_private_email_is_resolved_from_emails_endpoint() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 1).await;
    mount_user(&server, "".into(), 1).await;
    mount_emails(
        &server,
        serde_json::json!([
            {"email": "work@example.com", "primary": false, "verified": true},
            {"email": "octocat@users.noreply.github.com", "primary": true, "verified": true}
        ]),
        1,
    )
    .await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=good-code"), Some(&state))
        .await;

    assert_eq!(response.status(), 307);
    let token = query_param(&location(&response), "token").expect("token parameter");
    let claims = verify_session_token(
        &token,
        &server.state.config.session.secret,
        server.state.config.server.issuer(),
    )
    .expect("token verifies");
    assert_eq!(claims.email, "octocat@users.noreply.github.com");

    server.github.verify().await;
}

#[tokio::test]
async fn test_missing_verified_primary_email_fails() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 1).await;
    mount_user(&server, "".into(), 1).await;
    mount_emails(
        &server,
        serde_json::json!([
            {"email": "octocat@example.com", "primary": true, "verified": false}
        ]),
        1,
    )
    .await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=good-code"), Some(&state))
        .await;

    assert_eq!(response.status(), 500);
    assert!(response.headers().get("location").is_none());
    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|message| message.contains("verified primary email"))
    );

    server.github.verify().await;
}

#[tokio::test]
async fn test_rejected_code_fails_without_fetching_profile() {
    let server = TestServer::new().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .expect(1)
        .mount(&server.github)
        .await;
    mount_user(&server, "octocat@github.com".into(), 0).await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=reused-code"), Some(&state))
        .await;

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|message| message.contains("bad_verification_code"))
    );

    server.github.verify().await;
}

#[tokio::test]
async fn test_token_exchange_timeout_fails() {
    let server = TestServer::new().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "too-late"}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server.github)
        .await;
    mount_user(&server, "octocat@github.com".into(), 0).await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=slow-code"), Some(&state))
        .await;

    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn test_profile_fetch_failure_fails() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server.github)
        .await;
    mount_emails(&server, serde_json::json!([]), 0).await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=good-code"), Some(&state))
        .await;

    assert_eq!(response.status(), 500);
    server.github.verify().await;
}

#[tokio::test]
async fn test_session_token_is_accepted_by_me_endpoint() {
    let server = TestServer::new().await;
    mount_token_exchange(&server, 1).await;
    mount_user(&server, "octocat@github.com".into(), 1).await;

    let state = server.begin_login().await;
    let response = server
        .callback(&format!("state={state}&code=good-code"), Some(&state))
        .await;
    let token = query_param(&location(&response), "token").expect("token parameter");

    let response = server
        .client
        .get(server.url("/auth/me"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["sub"], "583231");
    assert_eq!(body["provider"], "github");
}

#[tokio::test]
async fn test_me_rejects_invalid_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/me"))
        .header("Authorization", "Bearer your-jwt-token")
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}
