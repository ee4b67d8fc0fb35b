//! Exercise discussion API server library.
//!
//! Exposes the building blocks (config, state, service, error handling,
//! routes, live viewer sockets) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod service;
pub mod state;
pub mod ws;
