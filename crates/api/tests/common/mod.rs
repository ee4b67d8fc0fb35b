#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use tutor_api::auth::jwt::{generate_access_token, JwtConfig};
use tutor_api::collaborators::{StaticExerciseGate, StaticUserDirectory};
use tutor_api::config::ServerConfig;
use tutor_api::router::build_app_router;
use tutor_api::service::CommentService;
use tutor_api::state::AppState;
use tutor_core::policy::CommentPolicy;
use tutor_core::types::DbId;
use tutor_db::InMemoryCommentStore;
use tutor_events::CommentBus;

/// Exercise that accepts comments.
pub const EXERCISE: DbId = 42;
/// Second open exercise, for scoping checks.
pub const OTHER_EXERCISE: DbId = 43;
/// Exercise that exists but does not accept comments.
pub const CLOSED_EXERCISE: DbId = 99;

pub const ADA: DbId = 1;
pub const GRACE: DbId = 2;
pub const LINUS: DbId = 3;
pub const MODERATOR: DbId = 9;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "comment-api-test-secret-0123456789abcdef".to_string(),
            access_token_expiry_mins: 15,
        },
        comments: CommentPolicy::default(),
    }
}

/// Application state over the in-memory store with a fixed set of users and
/// open exercises.
pub fn test_state(config: &ServerConfig) -> AppState {
    let bus = Arc::new(CommentBus::new());
    let users = StaticUserDirectory::default()
        .with_user(ADA, "ada")
        .with_user(GRACE, "grace")
        .with_user(LINUS, "linus")
        .with_user(MODERATOR, "mod");
    let comments = CommentService::new(
        Arc::new(InMemoryCommentStore::new(config.comments.clone())),
        Arc::clone(&bus),
        Arc::new(StaticExerciseGate::only([EXERCISE, OTHER_EXERCISE])),
        Arc::new(users),
        config.comments.clone(),
    );

    AppState {
        pool: None,
        config: Arc::new(config.clone()),
        comments: Arc::new(comments),
        bus,
        shutdown: CancellationToken::new(),
    }
}

/// Build the full application router with all middleware layers, the same
/// way `main.rs` does.
pub fn build_test_app() -> Router {
    let config = test_config();
    build_app_router(test_state(&config), &config)
}

/// Router plus the state behind it, for tests that inspect the bus.
pub fn build_test_app_with_state() -> (Router, AppState) {
    let config = test_config();
    let state = test_state(&config);
    (build_app_router(state.clone(), &config), state)
}

/// A valid bearer token for `user_id` with `role`.
pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

/// Send a request with an optional bearer token and JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
