//! Repository for the `exercises` table.

use sqlx::PgPool;
use tutor_core::types::DbId;

use crate::models::exercise::{CreateExercise, Exercise};

const COLUMNS: &str = "id, title, published, commentable, created_at";

pub struct ExerciseRepo;

impl ExerciseRepo {
    /// Insert a new exercise, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateExercise) -> Result<Exercise, sqlx::Error> {
        let query = format!(
            "INSERT INTO exercises (title, published, commentable)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Exercise>(&query)
            .bind(&input.title)
            .bind(input.published)
            .bind(input.commentable)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Exercise>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM exercises WHERE id = $1");
        sqlx::query_as::<_, Exercise>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
