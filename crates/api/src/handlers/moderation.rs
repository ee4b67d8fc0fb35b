//! Moderator handlers: the flag queue, comment lookups, and restoring hidden
//! comments.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use tutor_core::comment::CommentStatus;
use tutor_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireModerator;
use crate::query::{validated, DateRangeParams, FlaggedParams, PageParams, SearchParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/moderation/comments
///
/// Non-deleted comments with at least `min_flags` flags (default 1), most
/// flagged first.
pub async fn list_flagged(
    RequireModerator(user): RequireModerator,
    State(state): State<AppState>,
    Query(params): Query<FlaggedParams>,
) -> AppResult<impl IntoResponse> {
    let params = validated(params)?;
    let comments = state
        .comments
        .find_flagged(&user.actor(), params.min_flags)
        .await?;
    Ok(Json(DataResponse::new(comments)))
}

/// GET /api/v1/moderation/comments/status/{status}
///
/// Comments in one status (`VISIBLE`, `HIDDEN`, `DELETED`), newest first.
pub async fn list_by_status(
    RequireModerator(user): RequireModerator,
    State(state): State<AppState>,
    Path(status): Path<String>,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let status: CommentStatus = status.parse()?;
    let params = validated(params)?;
    let page = state.comments.page(params.page, params.page_size);
    let comments = state
        .comments
        .find_by_status(&user.actor(), status, page)
        .await?;
    Ok(Json(DataResponse::new(comments)))
}

/// GET /api/v1/moderation/comments/author/{user_id}
pub async fn list_by_author(
    RequireModerator(user): RequireModerator,
    State(state): State<AppState>,
    Path(author_id): Path<DbId>,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let params = validated(params)?;
    let page = state.comments.page(params.page, params.page_size);
    let comments = state
        .comments
        .find_by_author(&user.actor(), author_id, page)
        .await?;
    Ok(Json(DataResponse::new(comments)))
}

/// GET /api/v1/moderation/comments/search?q=
///
/// Case-insensitive substring match on content.
pub async fn search_comments(
    RequireModerator(user): RequireModerator,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let params = validated(params)?;
    let page = state.comments.page(params.page, params.page_size);
    let comments = state
        .comments
        .search(&user.actor(), &params.q, page)
        .await?;
    Ok(Json(DataResponse::new(comments)))
}

/// GET /api/v1/moderation/comments/range?from=&to=
pub async fn list_by_date_range(
    RequireModerator(user): RequireModerator,
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> AppResult<impl IntoResponse> {
    let params = params.checked()?;
    let comments = state
        .comments
        .find_by_date_range(&user.actor(), params.from, params.to)
        .await?;
    Ok(Json(DataResponse::new(comments)))
}

/// POST /api/v1/comments/{id}/restore
///
/// Return a hidden comment to its thread. Flags already recorded stay, so
/// the next distinct flag hides it again.
pub async fn restore_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let comment = state.comments.restore(&auth.actor(), comment_id).await?;
    Ok(Json(DataResponse::new(comment)))
}
