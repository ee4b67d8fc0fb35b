//! Comment status state machine, content validation, and error taxonomy.
//!
//! A comment starts `VISIBLE`, may be hidden automatically once its flag
//! count reaches the configured threshold, and is deleted at most once.
//! `DELETED` is terminal. A moderator may restore a `HIDDEN` comment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Content shown in place of the original text of a deleted comment.
pub const TOMBSTONE_CONTENT: &str = "[deleted]";

/// Maximum length (in characters) of a comment body.
pub const MAX_COMMENT_LENGTH: usize = 1_000;

/* --------------------------------------------------------------------------
Status
-------------------------------------------------------------------------- */

/// Moderation status of a comment, stored as TEXT in the `comments` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    Visible,
    Hidden,
    Deleted,
}

impl CommentStatus {
    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            CommentStatus::Visible => "VISIBLE",
            CommentStatus::Hidden => "HIDDEN",
            CommentStatus::Deleted => "DELETED",
        }
    }

    /// `DELETED` has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        self == CommentStatus::Deleted
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Self-transitions are not transitions and return `false`.
    pub fn can_transition_to(self, next: CommentStatus) -> bool {
        matches!(
            (self, next),
            (CommentStatus::Visible, CommentStatus::Hidden)
                | (CommentStatus::Visible, CommentStatus::Deleted)
                | (CommentStatus::Hidden, CommentStatus::Deleted)
                | (CommentStatus::Hidden, CommentStatus::Visible)
        )
    }

    /// Status after a flag has raised the count to `flags_count`.
    ///
    /// Only a `VISIBLE` comment reaching `threshold` changes state.
    pub fn after_flag(self, flags_count: i32, threshold: i32) -> CommentStatus {
        if self == CommentStatus::Visible && flags_count >= threshold {
            CommentStatus::Hidden
        } else {
            self
        }
    }
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VISIBLE" => Ok(CommentStatus::Visible),
            "HIDDEN" => Ok(CommentStatus::Hidden),
            "DELETED" => Ok(CommentStatus::Deleted),
            other => Err(CoreError::Validation(format!(
                "Invalid comment status '{other}'. Must be one of: VISIBLE, HIDDEN, DELETED"
            ))),
        }
    }
}

impl TryFrom<String> for CommentStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/* --------------------------------------------------------------------------
Errors
-------------------------------------------------------------------------- */

/// Failures returned by comment operations.
///
/// All of these are rejections of a single request: none is retried and
/// none leaves a partial mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommentError {
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Comment {0} not found")]
    NotFound(DbId),

    #[error("Parent comment {parent_id} not found in exercise {exercise_id}")]
    ParentNotFound { parent_id: DbId, exercise_id: DbId },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Comment {0} has been deleted")]
    AlreadyDeleted(DbId),

    #[error("User {flagger_id} has already flagged comment {comment_id}")]
    AlreadyFlagged { comment_id: DbId, flagger_id: DbId },

    #[error("Exercise {0} does not exist or does not allow comments")]
    ExerciseUnavailable(DbId),

    #[error("Rate limit exceeded: at most {limit} comments per {window_secs} seconds")]
    RateLimited { limit: i64, window_secs: i64 },

    #[error("Authentication required: {0}")]
    Unauthenticated(String),
}

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// Validate comment content for create and edit.
///
/// Content must contain at least one non-whitespace character and must not
/// exceed `max_length` characters.
pub fn validate_comment_content(content: &str, max_length: usize) -> Result<(), CommentError> {
    if content.trim().is_empty() {
        return Err(CommentError::InvalidContent(
            "Comment content must not be blank".to_string(),
        ));
    }

    let length = content.chars().count();
    if length > max_length {
        return Err(CommentError::InvalidContent(format!(
            "Comment content exceeds maximum length of {max_length} characters"
        )));
    }

    Ok(())
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
