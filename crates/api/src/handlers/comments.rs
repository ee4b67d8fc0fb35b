//! Handlers for exercise discussion threads.
//!
//! Reading and posting are open to anonymous visitors; editing, deleting and
//! flagging require a signed-in user.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tutor_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, OptionalAuth, SessionId};
use crate::query::{validated, PageParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /exercises/{id}/comments`.
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<DbId>,
}

/// Body of `PUT /comments/{id}`.
#[derive(Debug, Deserialize)]
pub struct EditCommentRequest {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// GET /api/v1/exercises/{id}/comments
///
/// Visible top-level comments, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(exercise_id): Path<DbId>,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let params = validated(params)?;
    let page = state.comments.page(params.page, params.page_size);
    let comments = state.comments.find_top_level(exercise_id, page).await?;
    Ok(Json(DataResponse::new(comments)))
}

/// POST /api/v1/exercises/{id}/comments
///
/// Post a top-level comment or, with `parent_id`, a reply.
pub async fn create_comment(
    auth: OptionalAuth,
    session: SessionId,
    State(state): State<AppState>,
    Path(exercise_id): Path<DbId>,
    Json(input): Json<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let actor = auth.actor(session);
    let comment = state
        .comments
        .create(&actor, exercise_id, input.content, input.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(comment))))
}

/// GET /api/v1/comments/{id}
///
/// A single comment in any status. Deleted comments carry the tombstone text.
pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let comment = state.comments.get(comment_id).await?;
    Ok(Json(DataResponse::new(comment)))
}

/// GET /api/v1/comments/{id}/replies
///
/// Visible replies, oldest first.
pub async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let params = validated(params)?;
    let page = state.comments.page(params.page, params.page_size);
    let replies = state.comments.find_replies(comment_id, page).await?;
    Ok(Json(DataResponse::new(replies)))
}

// ---------------------------------------------------------------------------
// Author actions
// ---------------------------------------------------------------------------

/// PUT /api/v1/comments/{id}
pub async fn edit_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
    Json(input): Json<EditCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let comment = state
        .comments
        .edit(&auth.actor(), comment_id, &input.content)
        .await?;
    Ok(Json(DataResponse::new(comment)))
}

/// DELETE /api/v1/comments/{id}
///
/// Redacts the comment. Authors may delete their own; moderators any.
/// Deleting an already deleted comment succeeds without change.
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let comment = state.comments.soft_delete(&auth.actor(), comment_id).await?;
    Ok(Json(DataResponse::new(comment)))
}

/// POST /api/v1/comments/{id}/flags
///
/// Report a comment. Each user may flag a comment once.
pub async fn flag_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.comments.flag(&auth.actor(), comment_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(outcome))))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions/{session_id}/comments
pub async fn list_session_comments(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let comments = state.comments.find_by_session(&session_id).await?;
    Ok(Json(DataResponse::new(comments)))
}
