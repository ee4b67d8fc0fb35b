//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods that take part in a row-locking transaction accept
//! `&mut PgConnection`; everything else accepts `&PgPool`.

pub mod comment_flag_repo;
pub mod comment_repo;
pub mod exercise_repo;
pub mod user_repo;

pub use comment_flag_repo::CommentFlagRepo;
pub use comment_repo::CommentRepo;
pub use exercise_repo::ExerciseRepo;
pub use user_repo::UserRepo;
