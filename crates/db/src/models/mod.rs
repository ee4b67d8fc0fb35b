//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A plain input struct for inserts
//! - Read shapes returned to the view layer, where there is one

pub mod comment;
pub mod comment_flag;
pub mod exercise;
pub mod user;
