//! API routes

pub mod health;
pub mod rooms;
pub mod token;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{state::AppState, websocket::ws_handler};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // The web app and the browser both call in from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(300));

    let health_routes = Router::new().route("/health", get(health::health));

    // Connection establishment
    let realtime_routes = Router::new()
        .route("/token", get(token::issue_token))
        .route("/ws", get(ws_handler));

    // Room events pushed by the web app on behalf of a member
    let room_routes = Router::new()
        .route("/vote", post(rooms::vote))
        .route("/story", post(rooms::new_story))
        .route("/reveal-story", post(rooms::reveal_story))
        .route("/unreveal-story", post(rooms::unreveal_story))
        .route("/join", post(rooms::join));

    Router::new()
        .merge(health_routes)
        .merge(realtime_routes)
        .merge(room_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
