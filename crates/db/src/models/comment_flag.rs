//! Comment flag model (one user's report of one comment).

use serde::Serialize;
use sqlx::FromRow;
use tutor_core::types::{DbId, Timestamp};

use super::comment::Comment;

/// A row from the `comment_flags` table. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CommentFlag {
    pub id: DbId,
    pub comment_id: DbId,
    pub flagger_id: DbId,
    pub created_at: Timestamp,
}

/// Outcome of a successful flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagResult {
    pub flag: CommentFlag,
    /// The comment after the flag was counted.
    pub comment: Comment,
    /// Whether this flag moved the comment from VISIBLE to HIDDEN.
    pub became_hidden: bool,
}
