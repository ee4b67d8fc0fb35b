//! Per-viewer delivery: an execution context that owns the viewer's panel,
//! and a sink that feeds it from the bus.

pub mod context;
pub mod sink;

pub use context::{CommentPanel, ViewerCommand, ViewerContext, ViewerError, ViewerHandle};
pub use sink::ViewerSink;
