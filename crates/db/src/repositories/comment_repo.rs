//! Repository for the `comments` table.

use sqlx::{PgConnection, PgPool};
use tutor_core::comment::{CommentStatus, TOMBSTONE_CONTENT};
use tutor_core::paging::{PageRequest, ThreadOrder};
use tutor_core::types::{DbId, Timestamp};

use crate::models::comment::{Comment, NewComment};

/// Column list shared across queries.
const COLUMNS: &str = "id, exercise_id, author_id, session_id, parent_id, content, status, \
    flags_count, created_at, edited_at, deleted_by, deleted_at";

/// Provides queries and row-level updates for comments.
pub struct CommentRepo;

impl CommentRepo {
    /// Insert a new VISIBLE comment, returning the created row.
    pub async fn insert(conn: &mut PgConnection, input: &NewComment) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "INSERT INTO comments (exercise_id, author_id, session_id, parent_id, content, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(input.exercise_id)
            .bind(input.author_id)
            .bind(&input.session_id)
            .bind(input.parent_id)
            .bind(&input.content)
            .bind(CommentStatus::Visible.as_str())
            .fetch_one(conn)
            .await
    }

    /// Find a comment by ID, in any status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comments WHERE id = $1");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a comment by ID inside a transaction, without locking it.
    pub async fn find_in_tx(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comments WHERE id = $1");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock a comment row until the surrounding transaction ends.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comments WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Replace the content of a comment and stamp `edited_at`.
    pub async fn update_content(
        conn: &mut PgConnection,
        id: DbId,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "UPDATE comments SET content = $2, edited_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(content)
            .fetch_one(conn)
            .await
    }

    /// Mark a comment DELETED and replace its content with the tombstone.
    pub async fn redact(
        conn: &mut PgConnection,
        id: DbId,
        deleted_by: DbId,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "UPDATE comments
             SET status = $2, content = $3, deleted_by = $4, deleted_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(CommentStatus::Deleted.as_str())
            .bind(TOMBSTONE_CONTENT)
            .bind(deleted_by)
            .fetch_one(conn)
            .await
    }

    /// Set the moderation status of a comment.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: CommentStatus,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "UPDATE comments SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    /// Write the flag counter and the status it implies in one statement.
    pub async fn set_flag_state(
        conn: &mut PgConnection,
        id: DbId,
        flags_count: i32,
        status: CommentStatus,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "UPDATE comments SET flags_count = $2, status = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(flags_count)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    /// VISIBLE top-level comments of an exercise, newest first.
    pub async fn list_top_level(
        pool: &PgPool,
        exercise_id: DbId,
        page: PageRequest,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE exercise_id = $1 AND parent_id IS NULL AND status = $2
             ORDER BY {}
             LIMIT $3 OFFSET $4",
            ThreadOrder::NewestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(exercise_id)
            .bind(CommentStatus::Visible.as_str())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// VISIBLE replies to a comment, oldest first.
    pub async fn list_replies(
        pool: &PgPool,
        parent_id: DbId,
        page: PageRequest,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE parent_id = $1 AND status = $2
             ORDER BY {}
             LIMIT $3 OFFSET $4",
            ThreadOrder::OldestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(parent_id)
            .bind(CommentStatus::Visible.as_str())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Non-deleted comments with at least `min_flags` flags, most flagged first.
    pub async fn list_flagged(pool: &PgPool, min_flags: i32) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE flags_count >= $1 AND status <> $2
             ORDER BY flags_count DESC, id DESC"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(min_flags)
            .bind(CommentStatus::Deleted.as_str())
            .fetch_all(pool)
            .await
    }

    /// Non-deleted comments from one anonymous session, newest first.
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE session_id = $1 AND status <> $2
             ORDER BY {}",
            ThreadOrder::NewestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(session_id)
            .bind(CommentStatus::Deleted.as_str())
            .fetch_all(pool)
            .await
    }

    /// Number of comments written by an author at or after `since`.
    pub async fn count_by_author_since(
        pool: &PgPool,
        author_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments WHERE author_id = $1 AND created_at >= $2",
        )
        .bind(author_id)
        .bind(since)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Serialize creates by one author until the surrounding transaction ends.
    pub async fn lock_author(conn: &mut PgConnection, author_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(author_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Comments written by an author in the last `window_secs`, measured
    /// against the transaction clock that also stamps `created_at`.
    pub async fn count_recent_by_author(
        conn: &mut PgConnection,
        author_id: DbId,
        window_secs: i64,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments
             WHERE author_id = $1 AND created_at >= NOW() - make_interval(secs => $2)",
        )
        .bind(author_id)
        .bind(window_secs as f64)
        .fetch_one(conn)
        .await?;
        Ok(row.0)
    }

    /// Comments in one status, newest first.
    pub async fn list_by_status(
        pool: &PgPool,
        status: CommentStatus,
        page: PageRequest,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE status = $1
             ORDER BY {}
             LIMIT $2 OFFSET $3",
            ThreadOrder::NewestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(status.as_str())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Comments by one author in any status, newest first.
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: DbId,
        page: PageRequest,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE author_id = $1
             ORDER BY {}
             LIMIT $2 OFFSET $3",
            ThreadOrder::NewestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(author_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Case-insensitive substring search over content, newest first.
    pub async fn search(
        pool: &PgPool,
        term: &str,
        page: PageRequest,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE content ILIKE $1
             ORDER BY {}
             LIMIT $2 OFFSET $3",
            ThreadOrder::NewestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(like_pattern(term))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await
    }

    /// Comments created in `[start, end)`, newest first.
    pub async fn list_by_date_range(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE created_at >= $1 AND created_at < $2
             ORDER BY {}",
            ThreadOrder::NewestFirst.sql()
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
