//! Comment persistence.
//!
//! - [`models`] -- row structs for `comments` and `comment_flags`.
//! - [`store`] -- the [`CommentStore`] operation surface and its error type.
//! - [`memory`] -- [`InMemoryCommentStore`], an arena of nodes with a parent index.
//! - [`pg`] -- [`PgCommentStore`], backed by PostgreSQL row-level transactions.
//! - [`repositories`] -- the SQL used by the Postgres store and collaborators.

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod store;

pub use memory::InMemoryCommentStore;
pub use pg::PgCommentStore;
pub use store::{CommentStore, StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
