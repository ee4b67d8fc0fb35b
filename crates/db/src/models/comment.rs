//! Comment row model, insert input, and the view-layer read shape.

use serde::Serialize;
use sqlx::FromRow;
use tutor_core::comment::{CommentStatus, TOMBSTONE_CONTENT};
use tutor_core::types::{DbId, Timestamp};

/// A row from the `comments` table.
///
/// `parent_id` is a plain index into the same table; the tree is never held
/// as live references.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub exercise_id: DbId,
    pub author_id: Option<DbId>,
    pub session_id: Option<String>,
    pub parent_id: Option<DbId>,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub status: CommentStatus,
    pub flags_count: i32,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.status == CommentStatus::Deleted
    }

    /// Whether `actor_id` authored this comment. Anonymous comments have no author.
    pub fn is_authored_by(&self, actor_id: DbId) -> bool {
        self.author_id == Some(actor_id)
    }

    /// Redact the comment in place, keeping its position in the tree.
    pub fn redact(&mut self, actor_id: DbId, now: Timestamp) {
        self.status = CommentStatus::Deleted;
        self.content = TOMBSTONE_CONTENT.to_string();
        self.deleted_by = Some(actor_id);
        self.deleted_at = Some(now);
    }
}

/// Cap on comments one author may post inside a sliding window.
///
/// Checked by the store in the same critical section as the insert, and
/// measured against the store's own clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: i64,
    pub window_secs: i64,
}

/// Input for creating a new comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub exercise_id: DbId,
    pub author_id: Option<DbId>,
    pub session_id: Option<String>,
    pub parent_id: Option<DbId>,
    pub content: String,
    /// Applies only when `author_id` is set.
    pub rate_limit: Option<RateLimit>,
}

impl NewComment {
    /// A top-level comment on an exercise.
    pub fn top_level(exercise_id: DbId, content: impl Into<String>) -> Self {
        Self {
            exercise_id,
            author_id: None,
            session_id: None,
            parent_id: None,
            content: content.into(),
            rate_limit: None,
        }
    }

    pub fn by_author(mut self, author_id: DbId) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attach the comment as a reply to `parent_id`.
    pub fn reply_to(mut self, parent_id: DbId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn limited(mut self, limit: i64, window_secs: i64) -> Self {
        self.rate_limit = Some(RateLimit { limit, window_secs });
        self
    }

    /// The limit to enforce, if any, keyed by the author it applies to.
    pub fn author_limit(&self) -> Option<(DbId, RateLimit)> {
        Some((self.author_id?, self.rate_limit?))
    }
}

/// Read shape handed to the comment panel.
///
/// `content` of a deleted comment is the tombstone text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: DbId,
    pub content: String,
    pub exercise_id: DbId,
    pub parent_id: Option<DbId>,
    pub author_id: Option<DbId>,
    pub username: Option<String>,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
    pub status: CommentStatus,
    pub flags_count: i32,
}

impl CommentView {
    pub fn new(comment: Comment, username: Option<String>) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            exercise_id: comment.exercise_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            username,
            created_at: comment.created_at,
            edited_at: comment.edited_at,
            status: comment.status,
            flags_count: comment.flags_count,
        }
    }
}
