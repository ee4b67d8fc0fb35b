//! Repository for the `users` table.

use sqlx::PgPool;
use tutor_core::types::DbId;

use crate::models::user::{CreateUser, User};

const COLUMNS: &str = "id, username, role, created_at";

pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, role)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Resolve usernames for a batch of user IDs. Unknown IDs are skipped.
    pub async fn usernames(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<(DbId, String)>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, (DbId, String)>("SELECT id, username FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
