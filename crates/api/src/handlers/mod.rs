pub mod comments;
pub mod moderation;
