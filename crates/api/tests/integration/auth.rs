use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use crate::common::{error_code, TestApp};

#[tokio::test]
async fn test_health_reports_live_counts() {
    let app = TestApp::new().await;
    let _a = app.connect("a", "r1").await;
    let _b = app.connect("b", "r2").await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["connections"], 2);
    assert_eq!(health["rooms"], 2);
}

#[tokio::test]
async fn test_token_requires_identity() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/token", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    let (status, body) = app.get("/token", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
}

#[tokio::test]
async fn test_non_bearer_authorization_rejected() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/token")
        .header(header::AUTHORIZATION, "Basic YTpi")
        .body(Body::empty())
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ephemeral_token_is_single_use() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut socket = app.connect("a", "r1").await;

    let (status, token) = app.get("/token", Some(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!token.is_empty());

    let uri = format!("/unreveal-story?token={token}");
    let (status, _) = app.post_json(&uri, None, json!({ "storyId": "s1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(socket.next_json().await["action"], "unreveal_story");

    // Second redemption fails
    let (status, body) = app.post_json(&uri, None, json!({ "storyId": "s1" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
    socket.assert_idle();
}

#[tokio::test]
async fn test_ephemeral_token_cannot_mint_another() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let (_, token) = app.get("/token", Some(&bearer)).await;

    let (status, _) = app.get(&format!("/token?token={token}"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ephemeral_token_is_not_a_bearer_token() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let (_, token) = app.get("/token", Some(&bearer)).await;

    let (status, _) = app.get("/token", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_query_token_wins_over_header() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");

    // A valid header does not rescue an unknown ephemeral token
    let (status, _) = app
        .post_json("/unreveal-story?token=unknown", Some(&bearer), json!({ "storyId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_rejects_unauthenticated_upgrade() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/ws", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/ws?token=expired-or-unknown", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.ws.get_stats().await.active_connections, 0);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/vote")
        .header(header::ORIGIN, "https://poker.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app.router(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "300");
}
