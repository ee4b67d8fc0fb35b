//! The server-side panel behind a live viewer socket.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc;
use tutor_core::paging::PageRequest;
use tutor_core::types::DbId;
use tutor_db::models::comment::CommentView;
use tutor_events::{CommentCreatedEvent, CommentPanel};

use crate::service::CommentService;

/// Frames pushed to the browser.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveFrame<'a> {
    /// A comment was posted; `comments` is the refreshed first page.
    CommentCreated {
        event: &'a CommentCreatedEvent,
        comments: Vec<CommentView>,
    },
    /// The first page, sent on connect and on request.
    Snapshot { comments: Vec<CommentView> },
}

/// Keeps one socket's view of an exercise thread current.
///
/// Runs inside a viewer context, so the first-page query for one event
/// finishes before the next event is looked at.
pub struct LivePanel {
    exercise_id: DbId,
    comments: Arc<CommentService>,
    page: PageRequest,
    outbound: mpsc::UnboundedSender<Message>,
    sent: usize,
}

impl LivePanel {
    pub fn new(
        exercise_id: DbId,
        comments: Arc<CommentService>,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let page = comments.page(None, None);
        Self {
            exercise_id,
            comments,
            page,
            outbound,
            sent: 0,
        }
    }

    /// Frames pushed so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    async fn first_page(&self) -> Option<Vec<CommentView>> {
        match self
            .comments
            .find_top_level(self.exercise_id, self.page)
            .await
        {
            Ok(comments) => Some(comments),
            Err(e) => {
                tracing::warn!(exercise_id = self.exercise_id, error = %e, "Live viewer refresh failed");
                None
            }
        }
    }

    fn push(&mut self, frame: &LiveFrame<'_>) {
        let payload = match serde_json::to_string(frame) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode live frame");
                return;
            }
        };
        if self.outbound.send(Message::Text(payload.into())).is_err() {
            tracing::debug!(exercise_id = self.exercise_id, "Live socket already closed");
            return;
        }
        self.sent += 1;
    }
}

#[async_trait]
impl CommentPanel for LivePanel {
    async fn on_comment_created(&mut self, event: &CommentCreatedEvent) {
        if let Some(comments) = self.first_page().await {
            self.push(&LiveFrame::CommentCreated { event, comments });
        }
    }

    async fn refresh(&mut self) {
        if let Some(comments) = self.first_page().await {
            self.push(&LiveFrame::Snapshot { comments });
        }
    }

    async fn on_detach(&mut self) {
        tracing::debug!(exercise_id = self.exercise_id, sent = self.sent, "Live panel detached");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_comment_created_frame_shape() {
        let event = CommentCreatedEvent::new(9, 42, "hello", Utc::now());
        let frame = LiveFrame::CommentCreated {
            event: &event,
            comments: Vec::new(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "comment_created");
        assert_eq!(json["event"]["comment_id"], 9);
        assert!(json["comments"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_frame_shape() {
        let json = serde_json::to_value(LiveFrame::Snapshot {
            comments: Vec::new(),
        })
        .unwrap();
        assert_eq!(json["type"], "snapshot");
    }
}
