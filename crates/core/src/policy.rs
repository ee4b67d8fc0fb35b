//! Tunable comment policy (flag threshold, paging, content and rate limits).

use crate::comment::MAX_COMMENT_LENGTH;
use crate::error::CoreError;

/// Distinct flags after which a visible comment is hidden.
pub const DEFAULT_FLAG_THRESHOLD: i32 = 5;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Upper bound for a caller-supplied page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Comments one author may post inside a rate window.
pub const DEFAULT_RATE_LIMIT: i64 = 10;

/// Length of the rate window in seconds.
pub const DEFAULT_RATE_WINDOW_SECS: i64 = 60;

/// Policy values shared by the store, the service, and the API layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentPolicy {
    pub flag_threshold: i32,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub max_length: usize,
    pub rate_limit: i64,
    pub rate_window_secs: i64,
}

impl Default for CommentPolicy {
    fn default() -> Self {
        Self {
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_length: MAX_COMMENT_LENGTH,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window_secs: DEFAULT_RATE_WINDOW_SECS,
        }
    }
}

impl CommentPolicy {
    /// Reject nonsensical combinations before the policy is put to use.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.flag_threshold < 1 {
            return Err(CoreError::Validation(
                "Flag threshold must be at least 1".to_string(),
            ));
        }
        if self.default_page_size < 1 || self.max_page_size < 1 {
            return Err(CoreError::Validation(
                "Page sizes must be at least 1".to_string(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(CoreError::Validation(format!(
                "Default page size {} exceeds maximum page size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.max_length == 0 {
            return Err(CoreError::Validation(
                "Maximum comment length must be positive".to_string(),
            ));
        }
        if self.rate_limit < 1 || self.rate_window_secs < 1 {
            return Err(CoreError::Validation(
                "Rate limit and rate window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
