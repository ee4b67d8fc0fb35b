use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tutor_events::CommentBus;

use crate::config::ServerConfig;
use crate::service::CommentService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. `None` when running on the in-memory store.
    pub pool: Option<tutor_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// Comment operations (store, bus and collaborators).
    pub comments: Arc<CommentService>,
    /// Notification bus shared with the comment service, for live viewers.
    pub bus: Arc<CommentBus>,
    /// Cancelled when the server begins shutting down; live sockets watch it.
    pub shutdown: CancellationToken,
}
