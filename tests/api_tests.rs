use async_trait::async_trait;
use challenges_client::auth::Session;
use challenges_client::prelude::*;
use serde_json::json;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Navigator for tests that never go through the login page
struct NoLogin;

#[async_trait]
impl Navigator for NoLogin {
    async fn login(&self, _authorization_url: Url) -> Result<Url, Error> {
        Err(Error::auth("login not expected"))
    }

    fn redirect(&self, _url: Url) {}
}

// Helper to create an app against the mock server, logged in with `token`
fn setup_app(server_uri: &str, token: Option<&str>) -> ChallengesApp {
    let options = ClientOptions::default().with_api_url(&format!("{}/api", server_uri));
    let app = ChallengesApp::new(options, Arc::new(NoLogin)).unwrap();
    if let Some(token) = token {
        app.session()
            .set_session(Session::new(token.to_string(), None, 300));
    }
    app
}

#[tokio::test]
async fn test_send_guess() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), Some("T"));

    Mock::given(method("POST"))
        .and(path("/api/attempts"))
        .and(header("Authorization", "Bearer T"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "alias": "alice",
            "factorA": 3,
            "factorB": 4,
            "guess": 12
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "userId": 7,
            "factorA": 3,
            "factorB": 4,
            "resultAttempt": 12,
            "correct": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = app.challenges().send_guess("alice", 3, 4, 12).await.unwrap();
    assert_eq!(result["correct"], json!(true));
}

#[tokio::test]
async fn test_get_users() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), Some("T"));

    Mock::given(method("GET"))
        .and(path("/api/users/1,2,3"))
        .and(header("Authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "alias": "alice" },
            { "id": 2, "alias": "bob" },
            { "id": 3, "alias": "carol" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let users = app.challenges().get_users(&[1, 2, 3]).await.unwrap();
    assert_eq!(users.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_get_attempts() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), Some("T"));

    Mock::given(method("GET"))
        .and(path("/api/attempts"))
        .and(query_param("alias", "alice"))
        .and(header("Authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let attempts = app.challenges().get_attempts("alice").await.unwrap();
    assert_eq!(attempts, json!([]));
}

#[tokio::test]
async fn test_challenge_is_anonymous() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), Some("T"));

    Mock::given(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/challenges/random"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "factorA": 42,
            "factorB": 17
        })))
        .expect(1)
        .mount(&server)
        .await;

    let challenge = app.challenges().challenge().await.unwrap();
    assert_eq!(challenge["factorA"], json!(42));
}

#[tokio::test]
async fn test_leader_board() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), Some("T"));

    Mock::given(method("GET"))
        .and(path("/api/leaders"))
        .and(header("Authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "userId": 1, "totalScore": 50, "badges": ["First time"] }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let leaders = app.gamification().leader_board().await.unwrap();
    assert_eq!(leaders[0]["totalScore"], json!(50));
}

#[tokio::test]
async fn test_unauthenticated_request_is_rejected() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), None);

    Mock::given(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(400))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/attempts"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let err = app
        .challenges()
        .send_guess("alice", 3, 4, 12)
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_server_error_is_returned() {
    let server = MockServer::start().await;
    let app = setup_app(&server.uri(), Some("T"));

    Mock::given(method("GET"))
        .and(path("/api/leaders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    match app.gamification().leader_board().await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "Service Unavailable");
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
