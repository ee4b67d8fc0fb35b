//! The comment store operation surface shared by every backend.
//!
//! Backends differ only in how they lock: the in-memory store uses a mutex
//! per node, Postgres uses `SELECT ... FOR UPDATE` inside a transaction. The
//! permission and state rules are the functions at the bottom of this module
//! and are applied identically by both.

use async_trait::async_trait;
use tutor_core::comment::{CommentError, CommentStatus};
use tutor_core::paging::PageRequest;
use tutor_core::types::{DbId, Timestamp};

use crate::models::comment::{Comment, NewComment, RateLimit};
use crate::models::comment_flag::FlagResult;

/// Errors returned by a [`CommentStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A rejected request. The store is unchanged.
    #[error(transparent)]
    Comment(#[from] CommentError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence and query of the comment tree, its moderation fields, and
/// the flag ledger.
///
/// Writers call these concurrently. `flag` is atomic per comment; every
/// other write is atomic per row.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist a new VISIBLE comment with no flags.
    ///
    /// Fails with `InvalidContent` for blank content, `ParentNotFound` if
    /// the parent does not exist in the same exercise, and `RateLimited` if
    /// `input` carries a limit its author has already used up. The count and
    /// the insert are serialized per author.
    async fn create(&self, input: NewComment) -> StoreResult<Comment>;

    /// Replace the content of a comment. Only its author may edit it.
    async fn edit(&self, comment_id: DbId, actor_id: DbId, new_content: &str)
        -> StoreResult<Comment>;

    /// Redact a comment. Author or moderator only; a no-op if already deleted.
    async fn soft_delete(
        &self,
        comment_id: DbId,
        actor_id: DbId,
        is_moderator: bool,
    ) -> StoreResult<Comment>;

    /// Record one flag per `(comment, flagger)` and hide the comment once the
    /// count reaches the configured threshold.
    async fn flag(&self, comment_id: DbId, flagger_id: DbId) -> StoreResult<FlagResult>;

    /// Return a HIDDEN comment to VISIBLE. Moderator only.
    async fn restore(&self, comment_id: DbId, is_moderator: bool) -> StoreResult<Comment>;

    /// Fetch a comment in any status.
    async fn find_by_id(&self, comment_id: DbId) -> StoreResult<Option<Comment>>;

    /// VISIBLE top-level comments of an exercise, newest first.
    async fn find_top_level(&self, exercise_id: DbId, page: PageRequest)
        -> StoreResult<Vec<Comment>>;

    /// VISIBLE replies to a comment, oldest first.
    async fn find_replies(&self, parent_id: DbId, page: PageRequest) -> StoreResult<Vec<Comment>>;

    /// Non-deleted comments with at least `min_flags` flags, most flagged first.
    async fn find_flagged(&self, min_flags: i32) -> StoreResult<Vec<Comment>>;

    /// Non-deleted comments from one anonymous browsing session, newest first.
    async fn find_by_session(&self, session_id: &str) -> StoreResult<Vec<Comment>>;

    /// Comments in `status`, newest first.
    async fn find_by_status(&self, status: CommentStatus, page: PageRequest)
        -> StoreResult<Vec<Comment>>;

    /// Comments written by one author in any status, newest first.
    async fn find_by_author(&self, author_id: DbId, page: PageRequest)
        -> StoreResult<Vec<Comment>>;

    /// Comments whose content contains `term`, ignoring case, newest first.
    async fn search(&self, term: &str, page: PageRequest) -> StoreResult<Vec<Comment>>;

    /// Comments created in `[start, end)`, newest first.
    async fn find_by_date_range(&self, start: Timestamp, end: Timestamp)
        -> StoreResult<Vec<Comment>>;

    /// Number of flag records for a comment.
    async fn count_flags(&self, comment_id: DbId) -> StoreResult<i64>;

    /// Comments written by `author_id` at or after `since`.
    async fn count_by_author_since(&self, author_id: DbId, since: Timestamp) -> StoreResult<i64>;
}

/* --------------------------------------------------------------------------
Rules
-------------------------------------------------------------------------- */

/// A reply must target an existing comment of the same exercise.
pub(crate) fn check_parent(
    parent: Option<&Comment>,
    parent_id: DbId,
    exercise_id: DbId,
) -> Result<(), CommentError> {
    match parent {
        Some(p) if p.exercise_id == exercise_id && p.id == parent_id => Ok(()),
        _ => Err(CommentError::ParentNotFound {
            parent_id,
            exercise_id,
        }),
    }
}

/// Reject a create once the author has `limit.limit` comments in the window.
pub(crate) fn check_rate_limit(recent: i64, limit: RateLimit) -> Result<(), CommentError> {
    if recent >= limit.limit {
        return Err(CommentError::RateLimited {
            limit: limit.limit,
            window_secs: limit.window_secs,
        });
    }
    Ok(())
}

/// Permission and state checks for an edit, in reporting order.
pub(crate) fn check_edit(
    comment: &Comment,
    actor_id: DbId,
    new_content: &str,
    max_length: usize,
) -> Result<(), CommentError> {
    if !comment.is_authored_by(actor_id) {
        return Err(CommentError::Forbidden(
            "Only the author may edit a comment".to_string(),
        ));
    }
    tutor_core::comment::validate_comment_content(new_content, max_length)?;
    if comment.is_deleted() {
        return Err(CommentError::AlreadyDeleted(comment.id));
    }
    Ok(())
}

/// Returns `true` when the delete must be applied, `false` when it is a no-op.
pub(crate) fn check_delete(
    comment: &Comment,
    actor_id: DbId,
    is_moderator: bool,
) -> Result<bool, CommentError> {
    if !is_moderator && !comment.is_authored_by(actor_id) {
        return Err(CommentError::Forbidden(
            "Only the author or a moderator may delete a comment".to_string(),
        ));
    }
    Ok(comment.status.can_transition_to(CommentStatus::Deleted))
}

/// Returns `true` when the restore must be applied, `false` when it is a no-op.
pub(crate) fn check_restore(comment: &Comment, is_moderator: bool) -> Result<bool, CommentError> {
    if !is_moderator {
        return Err(CommentError::Forbidden(
            "Only a moderator may restore a comment".to_string(),
        ));
    }
    if comment.status.is_terminal() {
        return Err(CommentError::AlreadyDeleted(comment.id));
    }
    Ok(comment.status.can_transition_to(CommentStatus::Visible))
}

/// Deleted comments accept no further flags.
pub(crate) fn check_flag(comment: &Comment) -> Result<(), CommentError> {
    if comment.status.is_terminal() {
        return Err(CommentError::AlreadyDeleted(comment.id));
    }
    Ok(())
}
