//! Shared query parameter types for API handlers.
//!
//! Values are checked with `validator` before they reach the service; page
//! sizes above the configured maximum are capped rather than rejected.

use serde::Deserialize;
use tutor_core::types::Timestamp;
use validator::Validate;

use crate::error::AppError;

/// Pagination parameters (`?page=&page_size=`). `page` is zero-based.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PageParams {
    #[validate(range(min = 0))]
    pub page: Option<i64>,
    #[validate(range(min = 1))]
    pub page_size: Option<i64>,
}

/// Moderation queue filter (`?min_flags=`).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct FlaggedParams {
    #[validate(range(min = 1))]
    pub min_flags: Option<i32>,
}

/// Moderator content search (`?q=&page=&page_size=`).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 200, message = "Search term must be 1-200 characters"))]
    pub q: String,
    #[validate(range(min = 0))]
    pub page: Option<i64>,
    #[validate(range(min = 1))]
    pub page_size: Option<i64>,
}

/// Creation-time window (`?from=&to=`), RFC 3339. `to` is exclusive.
#[derive(Debug, Deserialize)]
pub struct DateRangeParams {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl DateRangeParams {
    pub fn checked(self) -> Result<Self, AppError> {
        if self.from > self.to {
            return Err(AppError::BadRequest(
                "`from` must not be after `to`".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Run `validator` checks, mapping failures to a 400.
pub fn validated<T: Validate>(params: T) -> Result<T, AppError> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(params)
}
