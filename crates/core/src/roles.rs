//! Well-known role name constants.
//!
//! These must match the `role` values stored in the `users` table.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MODERATOR: &str = "moderator";
pub const ROLE_LEARNER: &str = "learner";

/// Whether a role may moderate comments (delete any, restore, review flags).
pub fn can_moderate(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_MODERATOR
}
