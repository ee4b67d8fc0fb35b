//! Route definitions for moderator tooling. Moderator role required.

use axum::routing::get;
use axum::Router;

use crate::handlers::moderation;
use crate::state::AppState;

/// Moderation routes mounted at `/moderation`.
///
/// ```text
/// GET /comments?min_flags=                  -> list_flagged
/// GET /comments/status/{status}             -> list_by_status
/// GET /comments/author/{user_id}            -> list_by_author
/// GET /comments/search?q=                   -> search_comments
/// GET /comments/range?from=&to=             -> list_by_date_range
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(moderation::list_flagged))
        .route("/comments/status/{status}", get(moderation::list_by_status))
        .route("/comments/author/{user_id}", get(moderation::list_by_author))
        .route("/comments/search", get(moderation::search_comments))
        .route("/comments/range", get(moderation::list_by_date_range))
}
