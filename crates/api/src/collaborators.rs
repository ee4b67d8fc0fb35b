//! Collaborators the comment service consults but does not own: whether an
//! exercise accepts comments, and how user ids map to display names.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::PgPool;
use tutor_core::types::DbId;
use tutor_db::repositories::{ExerciseRepo, UserRepo};
use tutor_db::StoreResult;

/// Answers "does this exercise exist and allow comments".
#[async_trait]
pub trait ExerciseGate: Send + Sync {
    async fn allows_comments(&self, exercise_id: DbId) -> StoreResult<bool>;
}

/// Resolves display names for comment authors.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Usernames for the given ids. Unknown ids are absent from the map.
    async fn usernames(&self, ids: &[DbId]) -> StoreResult<HashMap<DbId, String>>;
}

/* --------------------------------------------------------------------------
Postgres
-------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct PgExerciseGate {
    pool: PgPool,
}

impl PgExerciseGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExerciseGate for PgExerciseGate {
    async fn allows_comments(&self, exercise_id: DbId) -> StoreResult<bool> {
        let exercise = ExerciseRepo::find_by_id(&self.pool, exercise_id).await?;
        Ok(exercise.is_some_and(|e| e.allows_comments()))
    }
}

#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn usernames(&self, ids: &[DbId]) -> StoreResult<HashMap<DbId, String>> {
        Ok(UserRepo::usernames(&self.pool, ids)
            .await?
            .into_iter()
            .collect())
    }
}

/* --------------------------------------------------------------------------
In-memory
-------------------------------------------------------------------------- */

/// Fixed exercise gate: either every exercise is open, or only a listed set.
#[derive(Debug, Clone, Default)]
pub struct StaticExerciseGate {
    open: Option<HashSet<DbId>>,
}

impl StaticExerciseGate {
    pub fn allow_all() -> Self {
        Self { open: None }
    }

    pub fn only(ids: impl IntoIterator<Item = DbId>) -> Self {
        Self {
            open: Some(ids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ExerciseGate for StaticExerciseGate {
    async fn allows_comments(&self, exercise_id: DbId) -> StoreResult<bool> {
        Ok(self
            .open
            .as_ref()
            .is_none_or(|open| open.contains(&exercise_id)))
    }
}

/// Fixed id -> username table.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    names: HashMap<DbId, String>,
}

impl StaticUserDirectory {
    pub fn with_user(mut self, id: DbId, username: impl Into<String>) -> Self {
        self.names.insert(id, username.into());
        self
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn usernames(&self, ids: &[DbId]) -> StoreResult<HashMap<DbId, String>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.names.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
