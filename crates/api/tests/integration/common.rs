use axum::{
    body::{to_bytes, Body},
    extract::ws::Message,
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::channel::mpsc;
use futures::StreamExt;
use poker_api::{create_router, AppState, Config};
use poker_shared::Identity;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";

pub struct TestApp {
    pub state: AppState,
    pub pool: SqlitePool,
}

/// A registered connection: the server's writes land in `outbound`
pub struct TestSocket {
    pub outbound: mpsc::UnboundedReceiver<Message>,
    // Held so the reader keeps waiting instead of seeing end of stream
    _inbound: mpsc::UnboundedSender<Result<Message, String>>,
}

impl TestSocket {
    /// Next text frame, parsed as JSON
    pub async fn next_json(&mut self) -> Value {
        match tokio::time::timeout(Duration::from_secs(1), self.outbound.next()).await {
            Ok(Some(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Nothing has been written to this socket
    pub fn assert_idle(&mut self) {
        assert!(self.outbound.try_next().is_err(), "unexpected frame");
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        auth_secret: SECRET.to_string(),
        ephemeral_token_ttl_secs: 3,
        token_sweep_interval_secs: 30,
        dispatch_queue_capacity: 16,
        shutdown_drain_timeout_secs: 1,
        log_json: false,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection, so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");

        let (state, dispatcher) = AppState::new(test_config(), pool.clone());
        dispatcher.spawn();

        Self { state, pool }
    }

    /// Create the table the web app owns
    pub async fn with_votes_table(self) -> Self {
        sqlx::query(
            "CREATE TABLE votes (memberId TEXT NOT NULL, storyId TEXT NOT NULL, vote INTEGER, createdAt INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await
        .unwrap();
        self
    }

    pub async fn insert_vote(&self, member_id: &str, story_id: &str, vote: Option<i64>, created_at: i64) {
        sqlx::query("INSERT INTO votes (memberId, storyId, vote, createdAt) VALUES (?, ?, ?, ?)")
            .bind(member_id)
            .bind(story_id)
            .bind(vote)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn bearer(&self, user_id: &str, room_id: &str) -> String {
        self.state
            .jwt
            .generate_member_token(&Identity::new(user_id, user_id, room_id), None)
            .unwrap()
    }

    pub async fn connect(&self, user_id: &str, room_id: &str) -> TestSocket {
        let (inbound_tx, inbound_rx) = mpsc::unbounded();
        let (outbound_tx, outbound_rx) = mpsc::unbounded();
        self.state
            .ws
            .register_authenticated_connection(&Identity::new(user_id, user_id, room_id), outbound_tx, inbound_rx)
            .await;

        TestSocket {
            outbound: outbound_rx,
            _inbound: inbound_tx,
        }
    }

    /// Send a request and return status plus raw body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn post_json(&self, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, String) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

pub fn error_code(body: &str) -> String {
    let value: Value = serde_json::from_str(body).unwrap();
    value["error"]["code"].as_str().unwrap_or_default().to_string()
}
