//! Route definitions for discussion threads.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{comments, moderation};
use crate::state::AppState;
use crate::ws;

/// Thread routes mounted at `/exercises`.
///
/// ```text
/// GET  /{id}/comments          -> list_comments
/// POST /{id}/comments          -> create_comment
/// GET  /{id}/comments/live     -> live_comments (WebSocket)
/// ```
pub fn exercise_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/{id}/comments/live", get(ws::live_comments))
}

/// Single-comment routes mounted at `/comments`.
///
/// ```text
/// GET    /{id}            -> get_comment
/// PUT    /{id}            -> edit_comment
/// DELETE /{id}            -> delete_comment
/// GET    /{id}/replies    -> list_replies
/// POST   /{id}/flags      -> flag_comment
/// POST   /{id}/restore    -> restore_comment
/// ```
pub fn comment_router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(comments::get_comment)
                .put(comments::edit_comment)
                .delete(comments::delete_comment),
        )
        .route("/{id}/replies", get(comments::list_replies))
        .route("/{id}/flags", post(comments::flag_comment))
        .route("/{id}/restore", post(moderation::restore_comment))
}

/// Anonymous session routes mounted at `/sessions`.
pub fn session_router() -> Router<AppState> {
    Router::new().route("/{session_id}/comments", get(comments::list_session_comments))
}
