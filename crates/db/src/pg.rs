//! PostgreSQL-backed [`CommentStore`].
//!
//! Every write runs in its own transaction and locks the target row with
//! `SELECT ... FOR UPDATE` before applying the shared rules from
//! [`crate::store`]. A rate-limited create holds a transaction-scoped
//! advisory lock on its author while it counts and inserts. Rejections return before commit, so the transaction is
//! rolled back when it is dropped.

use async_trait::async_trait;
use sqlx::PgPool;
use tutor_core::comment::{validate_comment_content, CommentError, CommentStatus};
use tutor_core::paging::PageRequest;
use tutor_core::policy::CommentPolicy;
use tutor_core::types::{DbId, Timestamp};

use crate::models::comment::{Comment, NewComment};
use crate::models::comment_flag::FlagResult;
use crate::repositories::{CommentFlagRepo, CommentRepo};
use crate::store::{
    check_delete, check_edit, check_flag, check_parent, check_rate_limit, check_restore,
    CommentStore, StoreResult,
};

/// Comment store over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCommentStore {
    pool: PgPool,
    policy: CommentPolicy,
}

impl PgCommentStore {
    pub fn new(pool: PgPool, policy: CommentPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn create(&self, input: NewComment) -> StoreResult<Comment> {
        validate_comment_content(&input.content, self.policy.max_length)?;

        let mut tx = self.pool.begin().await?;

        if let Some((author_id, limit)) = input.author_limit() {
            CommentRepo::lock_author(&mut *tx, author_id).await?;
            let recent =
                CommentRepo::count_recent_by_author(&mut *tx, author_id, limit.window_secs).await?;
            check_rate_limit(recent, limit)?;
        }

        if let Some(parent_id) = input.parent_id {
            let parent = CommentRepo::find_in_tx(&mut *tx, parent_id).await?;
            check_parent(parent.as_ref(), parent_id, input.exercise_id)?;
        }

        let comment = CommentRepo::insert(&mut *tx, &input).await?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn edit(
        &self,
        comment_id: DbId,
        actor_id: DbId,
        new_content: &str,
    ) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let current = CommentRepo::lock_for_update(&mut *tx, comment_id)
            .await?
            .ok_or(CommentError::NotFound(comment_id))?;
        check_edit(&current, actor_id, new_content, self.policy.max_length)?;

        let updated = CommentRepo::update_content(&mut *tx, comment_id, new_content).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn soft_delete(
        &self,
        comment_id: DbId,
        actor_id: DbId,
        is_moderator: bool,
    ) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let current = CommentRepo::lock_for_update(&mut *tx, comment_id)
            .await?
            .ok_or(CommentError::NotFound(comment_id))?;
        if !check_delete(&current, actor_id, is_moderator)? {
            return Ok(current);
        }

        let deleted = CommentRepo::redact(&mut *tx, comment_id, actor_id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn flag(&self, comment_id: DbId, flagger_id: DbId) -> StoreResult<FlagResult> {
        let mut tx = self.pool.begin().await?;

        let current = CommentRepo::lock_for_update(&mut *tx, comment_id)
            .await?
            .ok_or(CommentError::NotFound(comment_id))?;
        check_flag(&current)?;

        let flag = CommentFlagRepo::insert_if_absent(&mut *tx, comment_id, flagger_id)
            .await?
            .ok_or(CommentError::AlreadyFlagged {
                comment_id,
                flagger_id,
            })?;

        let flags_count = current.flags_count + 1;
        let status = current
            .status
            .after_flag(flags_count, self.policy.flag_threshold);
        let comment = CommentRepo::set_flag_state(&mut *tx, comment_id, flags_count, status).await?;
        tx.commit().await?;

        let became_hidden = current.status != status;
        if became_hidden {
            tracing::info!(
                comment_id,
                flags_count,
                "Comment hidden after reaching flag threshold",
            );
        }

        Ok(FlagResult {
            flag,
            comment,
            became_hidden,
        })
    }

    async fn restore(&self, comment_id: DbId, is_moderator: bool) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let current = CommentRepo::lock_for_update(&mut *tx, comment_id)
            .await?
            .ok_or(CommentError::NotFound(comment_id))?;
        if !check_restore(&current, is_moderator)? {
            return Ok(current);
        }

        let restored = CommentRepo::set_status(&mut *tx, comment_id, CommentStatus::Visible).await?;
        tx.commit().await?;
        Ok(restored)
    }

    async fn find_by_id(&self, comment_id: DbId) -> StoreResult<Option<Comment>> {
        Ok(CommentRepo::find_by_id(&self.pool, comment_id).await?)
    }

    async fn find_top_level(
        &self,
        exercise_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_top_level(&self.pool, exercise_id, page).await?)
    }

    async fn find_replies(&self, parent_id: DbId, page: PageRequest) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_replies(&self.pool, parent_id, page).await?)
    }

    async fn find_flagged(&self, min_flags: i32) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_flagged(&self.pool, min_flags).await?)
    }

    async fn find_by_session(&self, session_id: &str) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_by_session(&self.pool, session_id).await?)
    }

    async fn find_by_status(
        &self,
        status: CommentStatus,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_by_status(&self.pool, status, page).await?)
    }

    async fn find_by_author(
        &self,
        author_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_by_author(&self.pool, author_id, page).await?)
    }

    async fn search(&self, term: &str, page: PageRequest) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::search(&self.pool, term, page).await?)
    }

    async fn find_by_date_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> StoreResult<Vec<Comment>> {
        Ok(CommentRepo::list_by_date_range(&self.pool, start, end).await?)
    }

    async fn count_flags(&self, comment_id: DbId) -> StoreResult<i64> {
        Ok(CommentFlagRepo::count_for_comment(&self.pool, comment_id).await?)
    }

    async fn count_by_author_since(&self, author_id: DbId, since: Timestamp) -> StoreResult<i64> {
        Ok(CommentRepo::count_by_author_since(&self.pool, author_id, since).await?)
    }
}
