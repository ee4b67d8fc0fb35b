//! WebSocket surface for live discussion viewers.
//!
//! Each socket owns one viewer context (see `tutor_events::ViewerContext`)
//! holding a [`live::LivePanel`], and one delivery sink subscribed to the
//! exercise on the comment bus.

mod handler;
pub mod live;

pub use handler::live_comments;
pub use live::LivePanel;
