//! Domain rules for exercise discussions.
//!
//! Pure types and functions shared by the persistence, event, and API
//! crates: identifiers, the comment status state machine, content and
//! paging rules, and the error taxonomy returned by comment operations.

pub mod comment;
pub mod error;
pub mod paging;
pub mod policy;
pub mod roles;
pub mod types;
