//! Repository for the `comment_flags` table.
//!
//! Flags are insert-only. The `(comment_id, flagger_id)` unique constraint
//! is the source of truth for "one flag per user per comment".

use sqlx::{PgConnection, PgPool};
use tutor_core::types::DbId;

use crate::models::comment_flag::CommentFlag;

const COLUMNS: &str = "id, comment_id, flagger_id, created_at";

pub struct CommentFlagRepo;

impl CommentFlagRepo {
    /// Insert a flag unless this user already flagged the comment.
    ///
    /// Returns `None` when the pair already exists.
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        comment_id: DbId,
        flagger_id: DbId,
    ) -> Result<Option<CommentFlag>, sqlx::Error> {
        let query = format!(
            "INSERT INTO comment_flags (comment_id, flagger_id)
             VALUES ($1, $2)
             ON CONFLICT (comment_id, flagger_id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CommentFlag>(&query)
            .bind(comment_id)
            .bind(flagger_id)
            .fetch_optional(conn)
            .await
    }

    /// Count flag records for a comment.
    pub async fn count_for_comment(pool: &PgPool, comment_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM comment_flags WHERE comment_id = $1")
                .bind(comment_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// List the flags of a comment, oldest first.
    pub async fn list_for_comment(
        pool: &PgPool,
        comment_id: DbId,
    ) -> Result<Vec<CommentFlag>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comment_flags WHERE comment_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, CommentFlag>(&query)
            .bind(comment_id)
            .fetch_all(pool)
            .await
    }
}
