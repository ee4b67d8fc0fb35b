use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tutor_core::comment::CommentError;
use tutor_core::error::CoreError;
use tutor_db::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "error": ..., "code": ... }`
/// JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A generic domain error from `tutor_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A rejected comment operation.
    #[error(transparent)]
    Comment(#[from] CommentError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Comment(e) => AppError::Comment(e),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Comment(err) => classify_comment_error(err),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
    }
}

/// Map the comment error taxonomy onto HTTP. None of these is logged above
/// `debug`: they are ordinary rejections of a single request.
fn classify_comment_error(err: &CommentError) -> (StatusCode, &'static str, String) {
    tracing::debug!(error = %err, "Comment request rejected");
    let (status, code) = match err {
        CommentError::InvalidContent(_) => (StatusCode::BAD_REQUEST, "INVALID_CONTENT"),
        CommentError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CommentError::ParentNotFound { .. } => (StatusCode::BAD_REQUEST, "PARENT_NOT_FOUND"),
        CommentError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        CommentError::AlreadyDeleted(_) => (StatusCode::CONFLICT, "ALREADY_DELETED"),
        CommentError::AlreadyFlagged { .. } => (StatusCode::CONFLICT, "ALREADY_FLAGGED"),
        CommentError::ExerciseUnavailable(_) => (StatusCode::BAD_REQUEST, "EXERCISE_UNAVAILABLE"),
        CommentError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        CommentError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
    };
    (status, code, err.to_string())
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
