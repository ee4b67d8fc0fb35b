//! Exercise row model. Only the fields the comment subsystem reads.

use serde::Serialize;
use sqlx::FromRow;
use tutor_core::types::{DbId, Timestamp};

/// A row from the `exercises` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exercise {
    pub id: DbId,
    pub title: String,
    pub published: bool,
    pub commentable: bool,
    pub created_at: Timestamp,
}

impl Exercise {
    /// Whether learners may comment on this exercise.
    pub fn allows_comments(&self) -> bool {
        self.published && self.commentable
    }
}

/// Input for creating an exercise.
#[derive(Debug, Clone)]
pub struct CreateExercise {
    pub title: String,
    pub published: bool,
    pub commentable: bool,
}
