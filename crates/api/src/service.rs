//! Comment service: the store, the notification bus and the collaborators
//! wired together behind the operations the HTTP surface exposes.

use std::collections::HashSet;
use std::sync::Arc;

use tutor_core::comment::{CommentError, CommentStatus};
use tutor_core::paging::PageRequest;
use tutor_core::policy::CommentPolicy;
use tutor_core::types::{DbId, Timestamp};
use tutor_db::models::comment::{Comment, CommentView, NewComment};
use tutor_db::models::comment_flag::CommentFlag;
use tutor_db::{CommentStore, StoreError, StoreResult};
use tutor_events::{CommentBus, CommentCreatedEvent};

use crate::collaborators::{ExerciseGate, UserDirectory};

/// Minimum flag count used by the moderation queue when none is given.
pub const DEFAULT_MIN_FLAGS: i32 = 1;

/// Who is performing an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<DbId>,
    pub session_id: Option<String>,
    pub is_moderator: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: DbId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn moderator(user_id: DbId) -> Self {
        Self {
            user_id: Some(user_id),
            is_moderator: true,
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    fn require_user(&self, action: &str) -> Result<DbId, CommentError> {
        self.user_id
            .ok_or_else(|| CommentError::Unauthenticated(format!("Sign in to {action}")))
    }

    fn require_moderator(&self) -> Result<(), CommentError> {
        if self.is_moderator {
            Ok(())
        } else {
            Err(CommentError::Forbidden("Moderator role required".to_string()))
        }
    }
}

/// Result of a successful flag, as returned to the flagger.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FlagOutcome {
    pub flag: CommentFlag,
    pub comment: CommentView,
    pub became_hidden: bool,
}

pub struct CommentService {
    store: Arc<dyn CommentStore>,
    bus: Arc<CommentBus>,
    exercises: Arc<dyn ExerciseGate>,
    users: Arc<dyn UserDirectory>,
    policy: CommentPolicy,
}

impl CommentService {
    pub fn new(
        store: Arc<dyn CommentStore>,
        bus: Arc<CommentBus>,
        exercises: Arc<dyn ExerciseGate>,
        users: Arc<dyn UserDirectory>,
        policy: CommentPolicy,
    ) -> Self {
        Self {
            store,
            bus,
            exercises,
            users,
            policy,
        }
    }

    pub fn bus(&self) -> &Arc<CommentBus> {
        &self.bus
    }

    pub fn policy(&self) -> &CommentPolicy {
        &self.policy
    }

    /// A page request built from optional query values under this policy.
    pub fn page(&self, page: Option<i64>, page_size: Option<i64>) -> PageRequest {
        PageRequest::from_query(page, page_size, &self.policy)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Fail with `ExerciseUnavailable` unless the exercise accepts comments.
    pub async fn ensure_commentable(&self, exercise_id: DbId) -> StoreResult<()> {
        if !self.exercises.allows_comments(exercise_id).await? {
            return Err(CommentError::ExerciseUnavailable(exercise_id).into());
        }
        Ok(())
    }

    /// Store a new comment and notify viewers of its exercise.
    ///
    /// Signed-in authors are rate limited by the store. Nothing is published
    /// unless the comment was stored.
    pub async fn create(
        &self,
        actor: &Actor,
        exercise_id: DbId,
        content: String,
        parent_id: Option<DbId>,
    ) -> StoreResult<CommentView> {
        self.ensure_commentable(exercise_id).await?;

        let mut input = NewComment::top_level(exercise_id, content)
            .limited(self.policy.rate_limit, self.policy.rate_window_secs);
        input.author_id = actor.user_id;
        input.session_id = actor.session_id.clone();
        input.parent_id = parent_id;

        let comment = match self.store.create(input).await {
            Ok(comment) => comment,
            Err(StoreError::Comment(e @ CommentError::RateLimited { .. })) => {
                tracing::info!(author_id = ?actor.user_id, exercise_id, "Comment rate limit reached");
                return Err(e.into());
            }
            Err(e) => return Err(e),
        };
        let username = self.author_name(&comment).await;

        tracing::info!(
            comment_id = comment.id,
            exercise_id = comment.exercise_id,
            parent_id = ?comment.parent_id,
            author_id = ?comment.author_id,
            "Comment created",
        );

        let mut event = CommentCreatedEvent::new(
            comment.id,
            comment.exercise_id,
            comment.content.clone(),
            comment.created_at,
        );
        if let Some(author_id) = comment.author_id {
            event = event.with_author(author_id, username.clone());
        }
        self.bus.publish(event).await;

        Ok(CommentView::new(comment, username))
    }

    pub async fn edit(
        &self,
        actor: &Actor,
        comment_id: DbId,
        content: &str,
    ) -> StoreResult<CommentView> {
        let actor_id = actor.require_user("edit comments")?;
        let comment = self.store.edit(comment_id, actor_id, content).await?;
        tracing::info!(comment_id, actor_id, "Comment edited");
        self.view(comment).await
    }

    pub async fn soft_delete(&self, actor: &Actor, comment_id: DbId) -> StoreResult<CommentView> {
        let actor_id = actor.require_user("delete comments")?;
        let comment = self
            .store
            .soft_delete(comment_id, actor_id, actor.is_moderator)
            .await?;
        tracing::info!(comment_id, actor_id, moderator = actor.is_moderator, "Comment deleted");
        self.view(comment).await
    }

    pub async fn flag(&self, actor: &Actor, comment_id: DbId) -> StoreResult<FlagOutcome> {
        let flagger_id = actor.require_user("flag comments")?;
        let result = self.store.flag(comment_id, flagger_id).await?;
        tracing::info!(
            comment_id,
            flagger_id,
            flags_count = result.comment.flags_count,
            became_hidden = result.became_hidden,
            "Comment flagged",
        );
        Ok(FlagOutcome {
            flag: result.flag,
            comment: self.view(result.comment).await?,
            became_hidden: result.became_hidden,
        })
    }

    /// Return a hidden comment to the thread.
    pub async fn restore(&self, actor: &Actor, comment_id: DbId) -> StoreResult<CommentView> {
        let comment = self.store.restore(comment_id, actor.is_moderator).await?;
        tracing::info!(comment_id, actor_id = ?actor.user_id, "Comment restored");
        self.view(comment).await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn get(&self, comment_id: DbId) -> StoreResult<CommentView> {
        let comment = self
            .store
            .find_by_id(comment_id)
            .await?
            .ok_or(CommentError::NotFound(comment_id))?;
        self.view(comment).await
    }

    pub async fn find_top_level(
        &self,
        exercise_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<CommentView>> {
        let comments = self.store.find_top_level(exercise_id, page).await?;
        self.views(comments).await
    }

    pub async fn find_replies(
        &self,
        parent_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<CommentView>> {
        let comments = self.store.find_replies(parent_id, page).await?;
        self.views(comments).await
    }

    /// The moderation queue. Moderators only.
    pub async fn find_flagged(
        &self,
        actor: &Actor,
        min_flags: Option<i32>,
    ) -> StoreResult<Vec<CommentView>> {
        actor.require_moderator()?;
        let comments = self
            .store
            .find_flagged(min_flags.unwrap_or(DEFAULT_MIN_FLAGS))
            .await?;
        self.views(comments).await
    }

    /// Moderator lookup: comments in one status.
    pub async fn find_by_status(
        &self,
        actor: &Actor,
        status: CommentStatus,
        page: PageRequest,
    ) -> StoreResult<Vec<CommentView>> {
        actor.require_moderator()?;
        let comments = self.store.find_by_status(status, page).await?;
        self.views(comments).await
    }

    /// Moderator lookup: everything one user has written.
    pub async fn find_by_author(
        &self,
        actor: &Actor,
        author_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<CommentView>> {
        actor.require_moderator()?;
        let comments = self.store.find_by_author(author_id, page).await?;
        self.views(comments).await
    }

    /// Moderator lookup: case-insensitive content search.
    pub async fn search(
        &self,
        actor: &Actor,
        term: &str,
        page: PageRequest,
    ) -> StoreResult<Vec<CommentView>> {
        actor.require_moderator()?;
        let comments = self.store.search(term.trim(), page).await?;
        self.views(comments).await
    }

    /// Moderator lookup: comments created in `[start, end)`.
    pub async fn find_by_date_range(
        &self,
        actor: &Actor,
        start: Timestamp,
        end: Timestamp,
    ) -> StoreResult<Vec<CommentView>> {
        actor.require_moderator()?;
        let comments = self.store.find_by_date_range(start, end).await?;
        self.views(comments).await
    }

    pub async fn find_by_session(&self, session_id: &str) -> StoreResult<Vec<CommentView>> {
        let comments = self.store.find_by_session(session_id).await?;
        self.views(comments).await
    }

    // -----------------------------------------------------------------------
    // Usernames
    // -----------------------------------------------------------------------

    /// Username of a freshly created comment's author. The comment is
    /// already stored, so a directory failure degrades to no name.
    async fn author_name(&self, comment: &Comment) -> Option<String> {
        let author_id = comment.author_id?;
        match self.users.usernames(&[author_id]).await {
            Ok(mut names) => names.remove(&author_id),
            Err(e) => {
                tracing::warn!(comment_id = comment.id, author_id, error = %e, "Username lookup failed");
                None
            }
        }
    }

    async fn view(&self, comment: Comment) -> StoreResult<CommentView> {
        let username = match comment.author_id {
            Some(id) => self.users.usernames(&[id]).await?.remove(&id),
            None => None,
        };
        Ok(CommentView::new(comment, username))
    }

    async fn views(&self, comments: Vec<Comment>) -> StoreResult<Vec<CommentView>> {
        let ids: Vec<DbId> = comments
            .iter()
            .filter_map(|c| c.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let names = if ids.is_empty() {
            Default::default()
        } else {
            self.users.usernames(&ids).await?
        };

        Ok(comments
            .into_iter()
            .map(|c| {
                let username = c.author_id.and_then(|id| names.get(&id).cloned());
                CommentView::new(c, username)
            })
            .collect())
    }
}
