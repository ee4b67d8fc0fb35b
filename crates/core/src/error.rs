//! Generic domain errors that are not specific to one comment operation.
//!
//! Comment operations report [`crate::comment::CommentError`] instead.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input or configuration.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing or invalid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credentials without the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}
