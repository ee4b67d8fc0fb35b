//! Live comment notifications.
//!
//! - [`bus`] -- [`CommentBus`], an in-process publish/subscribe registry keyed
//!   by exercise id, and its [`CommentCreatedEvent`] payload.
//! - [`viewer`] -- [`ViewerContext`], one serial task per open discussion view,
//!   and [`ViewerSink`], which feeds it from the bus.

pub mod bus;
pub mod viewer;

pub use bus::{CommentBus, CommentCreatedEvent, Subscription, SubscriptionHandle};
pub use viewer::{CommentPanel, ViewerCommand, ViewerContext, ViewerError, ViewerHandle, ViewerSink};
