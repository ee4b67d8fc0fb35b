//! Identity extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`auth::OptionalAuth`] -- Same, but anonymous requests pass through.
//! - [`auth::SessionId`] -- The anonymous browsing session from `x-session-id`.
//! - [`rbac::RequireModerator`] -- Requires the `moderator` or `admin` role.

pub mod auth;
pub mod rbac;
