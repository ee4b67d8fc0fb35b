pub mod comments;
pub mod health;
pub mod moderation;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /exercises/{id}/comments                         list, create
/// /exercises/{id}/comments/live                    WebSocket live viewer
///
/// /comments/{id}                                   get, edit, delete
/// /comments/{id}/replies                           list replies
/// /comments/{id}/flags                             flag (POST)
/// /comments/{id}/restore                           restore (moderator)
///
/// /moderation/comments                             flag queue (moderator)
/// /moderation/comments/status/{status}             by status (moderator)
/// /moderation/comments/author/{user_id}            by author (moderator)
/// /moderation/comments/search                      content search (moderator)
/// /moderation/comments/range                       by creation time (moderator)
///
/// /sessions/{session_id}/comments                  comments of one session
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/exercises", comments::exercise_router())
        .nest("/comments", comments::comment_router())
        .nest("/sessions", comments::session_router())
        .nest("/moderation", moderation::router())
}
