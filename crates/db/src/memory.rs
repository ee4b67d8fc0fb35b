//! In-process [`CommentStore`].
//!
//! Comments live in an arena keyed by id. Tree structure is kept as two
//! indices (top-level ids per exercise, child ids per parent) so a reply
//! never holds a reference to its parent. Each node carries its own flag
//! ledger behind a per-node mutex; the arena lock is only held long enough
//! to look nodes up or to insert one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tutor_core::comment::{validate_comment_content, CommentError, CommentStatus};
use tutor_core::paging::{PageRequest, ThreadOrder};
use tutor_core::policy::CommentPolicy;
use tutor_core::types::{DbId, Timestamp};

use crate::models::comment::{Comment, NewComment};
use crate::models::comment_flag::{CommentFlag, FlagResult};
use crate::store::{
    check_delete, check_edit, check_flag, check_parent, check_rate_limit, check_restore,
    CommentStore, StoreResult,
};

type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// One comment plus the flags recorded against it.
#[derive(Debug)]
struct Node {
    comment: Comment,
    flags: HashMap<DbId, CommentFlag>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: HashMap<DbId, Arc<Mutex<Node>>>,
    /// Top-level comment ids per exercise, in insertion order.
    top_level: HashMap<DbId, Vec<DbId>>,
    /// Reply ids per parent comment, in insertion order.
    children: HashMap<DbId, Vec<DbId>>,
    /// Creation times of each author's comments.
    authored: HashMap<DbId, Vec<Timestamp>>,
}

impl Arena {
    fn count_by_author_since(&self, author_id: DbId, since: Timestamp) -> i64 {
        self.authored
            .get(&author_id)
            .map_or(0, |times| times.iter().filter(|t| **t >= since).count() as i64)
    }
}

/// Comment store held entirely in memory.
pub struct InMemoryCommentStore {
    policy: CommentPolicy,
    clock: Clock,
    next_comment_id: AtomicI64,
    next_flag_id: AtomicI64,
    arena: RwLock<Arena>,
}

impl std::fmt::Debug for InMemoryCommentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCommentStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryCommentStore {
    fn default() -> Self {
        Self::new(CommentPolicy::default())
    }
}

impl InMemoryCommentStore {
    pub fn new(policy: CommentPolicy) -> Self {
        Self::with_clock(policy, Utc::now)
    }

    /// Build a store whose timestamps come from `clock`.
    pub fn with_clock(
        policy: CommentPolicy,
        clock: impl Fn() -> Timestamp + Send + Sync + 'static,
    ) -> Self {
        Self {
            policy,
            clock: Arc::new(clock),
            next_comment_id: AtomicI64::new(1),
            next_flag_id: AtomicI64::new(1),
            arena: RwLock::new(Arena::default()),
        }
    }

    pub fn policy(&self) -> &CommentPolicy {
        &self.policy
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }

    async fn node(&self, comment_id: DbId) -> StoreResult<Arc<Mutex<Node>>> {
        let arena = self.arena.read().await;
        arena
            .nodes
            .get(&comment_id)
            .cloned()
            .ok_or_else(|| CommentError::NotFound(comment_id).into())
    }

    /// Snapshot the comments of `nodes`, keep those matching `keep`, and sort
    /// them in `order`. Only one node lock is held at a time.
    async fn collect(
        &self,
        nodes: Vec<Arc<Mutex<Node>>>,
        order: ThreadOrder,
        keep: impl Fn(&Comment) -> bool,
    ) -> Vec<Comment> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = node.lock().await;
            if keep(&node.comment) {
                out.push(node.comment.clone());
            }
        }
        out.sort_by(|a, b| order.compare((a.created_at, a.id), (b.created_at, b.id)));
        out
    }

    async fn all_nodes(&self) -> Vec<Arc<Mutex<Node>>> {
        self.arena.read().await.nodes.values().cloned().collect()
    }

    async fn indexed_nodes(&self, ids: Option<&Vec<DbId>>) -> Vec<Arc<Mutex<Node>>> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        let arena = self.arena.read().await;
        ids.iter()
            .filter_map(|id| arena.nodes.get(id).cloned())
            .collect()
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn create(&self, input: NewComment) -> StoreResult<Comment> {
        validate_comment_content(&input.content, self.policy.max_length)?;

        let mut arena = self.arena.write().await;
        let now = self.now();

        if let Some((author_id, limit)) = input.author_limit() {
            let since = now - chrono::Duration::seconds(limit.window_secs);
            check_rate_limit(arena.count_by_author_since(author_id, since), limit)?;
        }

        if let Some(parent_id) = input.parent_id {
            match arena.nodes.get(&parent_id) {
                Some(parent) => {
                    let parent = parent.lock().await;
                    check_parent(Some(&parent.comment), parent_id, input.exercise_id)?;
                }
                None => check_parent(None, parent_id, input.exercise_id)?,
            }
        }

        let comment = Comment {
            id: self.next_comment_id.fetch_add(1, Ordering::Relaxed),
            exercise_id: input.exercise_id,
            author_id: input.author_id,
            session_id: input.session_id,
            parent_id: input.parent_id,
            content: input.content,
            status: CommentStatus::Visible,
            flags_count: 0,
            created_at: now,
            edited_at: None,
            deleted_by: None,
            deleted_at: None,
        };

        if let Some(author_id) = comment.author_id {
            arena.authored.entry(author_id).or_default().push(now);
        }

        match comment.parent_id {
            Some(parent_id) => arena.children.entry(parent_id).or_default().push(comment.id),
            None => arena
                .top_level
                .entry(comment.exercise_id)
                .or_default()
                .push(comment.id),
        }
        arena.nodes.insert(
            comment.id,
            Arc::new(Mutex::new(Node {
                comment: comment.clone(),
                flags: HashMap::new(),
            })),
        );

        Ok(comment)
    }

    async fn edit(
        &self,
        comment_id: DbId,
        actor_id: DbId,
        new_content: &str,
    ) -> StoreResult<Comment> {
        let node = self.node(comment_id).await?;
        let mut node = node.lock().await;

        check_edit(&node.comment, actor_id, new_content, self.policy.max_length)?;

        node.comment.content = new_content.to_string();
        node.comment.edited_at = Some(self.now());
        Ok(node.comment.clone())
    }

    async fn soft_delete(
        &self,
        comment_id: DbId,
        actor_id: DbId,
        is_moderator: bool,
    ) -> StoreResult<Comment> {
        let node = self.node(comment_id).await?;
        let mut node = node.lock().await;

        if check_delete(&node.comment, actor_id, is_moderator)? {
            let now = self.now();
            node.comment.redact(actor_id, now);
        }
        Ok(node.comment.clone())
    }

    async fn flag(&self, comment_id: DbId, flagger_id: DbId) -> StoreResult<FlagResult> {
        let node = self.node(comment_id).await?;
        let mut node = node.lock().await;

        check_flag(&node.comment)?;
        if node.flags.contains_key(&flagger_id) {
            return Err(CommentError::AlreadyFlagged {
                comment_id,
                flagger_id,
            }
            .into());
        }

        let flag = CommentFlag {
            id: self.next_flag_id.fetch_add(1, Ordering::Relaxed),
            comment_id,
            flagger_id,
            created_at: self.now(),
        };
        node.flags.insert(flagger_id, flag.clone());

        let before = node.comment.status;
        let flags_count = node.comment.flags_count + 1;
        let after = before.after_flag(flags_count, self.policy.flag_threshold);
        node.comment.flags_count = flags_count;
        node.comment.status = after;
        let became_hidden = before != after;

        if became_hidden {
            tracing::info!(
                comment_id,
                flags_count = node.comment.flags_count,
                "Comment hidden after reaching flag threshold",
            );
        }

        Ok(FlagResult {
            flag,
            comment: node.comment.clone(),
            became_hidden,
        })
    }

    async fn restore(&self, comment_id: DbId, is_moderator: bool) -> StoreResult<Comment> {
        let node = self.node(comment_id).await?;
        let mut node = node.lock().await;

        if check_restore(&node.comment, is_moderator)? {
            node.comment.status = CommentStatus::Visible;
        }
        Ok(node.comment.clone())
    }

    async fn find_by_id(&self, comment_id: DbId) -> StoreResult<Option<Comment>> {
        let node = self.arena.read().await.nodes.get(&comment_id).cloned();
        match node {
            Some(node) => Ok(Some(node.lock().await.comment.clone())),
            None => Ok(None),
        }
    }

    async fn find_top_level(
        &self,
        exercise_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        let ids = self.arena.read().await.top_level.get(&exercise_id).cloned();
        let nodes = self.indexed_nodes(ids.as_ref()).await;
        let visible = self
            .collect(nodes, ThreadOrder::NewestFirst, |c| {
                c.status == CommentStatus::Visible
            })
            .await;
        Ok(page.apply(visible))
    }

    async fn find_replies(&self, parent_id: DbId, page: PageRequest) -> StoreResult<Vec<Comment>> {
        let ids = self.arena.read().await.children.get(&parent_id).cloned();
        let nodes = self.indexed_nodes(ids.as_ref()).await;
        let visible = self
            .collect(nodes, ThreadOrder::OldestFirst, |c| {
                c.status == CommentStatus::Visible
            })
            .await;
        Ok(page.apply(visible))
    }

    async fn find_flagged(&self, min_flags: i32) -> StoreResult<Vec<Comment>> {
        let nodes = self.all_nodes().await;
        let mut flagged = self
            .collect(nodes, ThreadOrder::NewestFirst, |c| {
                !c.is_deleted() && c.flags_count >= min_flags
            })
            .await;
        flagged.sort_by(|a, b| {
            b.flags_count
                .cmp(&a.flags_count)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(flagged)
    }

    async fn find_by_session(&self, session_id: &str) -> StoreResult<Vec<Comment>> {
        let nodes = self.all_nodes().await;
        Ok(self
            .collect(nodes, ThreadOrder::NewestFirst, |c| {
                !c.is_deleted() && c.session_id.as_deref() == Some(session_id)
            })
            .await)
    }

    async fn find_by_status(
        &self,
        status: CommentStatus,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        let nodes = self.all_nodes().await;
        let found = self
            .collect(nodes, ThreadOrder::NewestFirst, |c| c.status == status)
            .await;
        Ok(page.apply(found))
    }

    async fn find_by_author(
        &self,
        author_id: DbId,
        page: PageRequest,
    ) -> StoreResult<Vec<Comment>> {
        let nodes = self.all_nodes().await;
        let found = self
            .collect(nodes, ThreadOrder::NewestFirst, |c| c.is_authored_by(author_id))
            .await;
        Ok(page.apply(found))
    }

    async fn search(&self, term: &str, page: PageRequest) -> StoreResult<Vec<Comment>> {
        let needle = term.to_lowercase();
        let nodes = self.all_nodes().await;
        let found = self
            .collect(nodes, ThreadOrder::NewestFirst, |c| {
                c.content.to_lowercase().contains(&needle)
            })
            .await;
        Ok(page.apply(found))
    }

    async fn find_by_date_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> StoreResult<Vec<Comment>> {
        let nodes = self.all_nodes().await;
        Ok(self
            .collect(nodes, ThreadOrder::NewestFirst, |c| {
                c.created_at >= start && c.created_at < end
            })
            .await)
    }

    async fn count_flags(&self, comment_id: DbId) -> StoreResult<i64> {
        let node = self.arena.read().await.nodes.get(&comment_id).cloned();
        match node {
            Some(node) => Ok(node.lock().await.flags.len() as i64),
            None => Ok(0),
        }
    }

    async fn count_by_author_since(&self, author_id: DbId, since: Timestamp) -> StoreResult<i64> {
        Ok(self.arena.read().await.count_by_author_since(author_id, since))
    }
}
