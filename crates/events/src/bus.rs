//! In-process comment notification bus keyed by exercise.
//!
//! [`CommentBus`] keeps one topic per exercise with at least one live
//! subscriber. Each subscriber owns an unbounded queue, so publishing never
//! waits on a viewer. Publishing to a topic is serialized by the topic's
//! lock, which gives every subscriber of one exercise the same event order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tutor_core::types::{DbId, Timestamp};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CommentCreatedEvent
// ---------------------------------------------------------------------------

/// Published after a comment has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentCreatedEvent {
    pub comment_id: DbId,
    pub exercise_id: DbId,
    pub author_id: Option<DbId>,
    pub username: Option<String>,
    pub content: String,
    pub created_at: Timestamp,
}

impl CommentCreatedEvent {
    pub fn new(
        comment_id: DbId,
        exercise_id: DbId,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            comment_id,
            exercise_id,
            author_id: None,
            username: None,
            content: content.into(),
            created_at,
        }
    }

    /// Attach the author and, if known, their display name.
    pub fn with_author(mut self, author_id: DbId, username: Option<String>) -> Self {
        self.author_id = Some(author_id);
        self.username = username;
        self
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Identifies one registration on the bus. Copyable so that both the owner
/// and a background task can unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: Uuid,
    pub exercise_id: DbId,
}

/// The receiving end of one registration.
///
/// Yields events in publish order and returns `None` once the subscription
/// has been removed from the bus (or the bus has been closed).
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<CommentCreatedEvent>,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    pub async fn recv(&mut self) -> Option<CommentCreatedEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, for draining in tests and shutdown paths.
    pub fn try_recv(&mut self) -> Option<CommentCreatedEvent> {
        self.receiver.try_recv().ok()
    }
}

type Subscribers = HashMap<Uuid, mpsc::UnboundedSender<CommentCreatedEvent>>;

// ---------------------------------------------------------------------------
// CommentBus
// ---------------------------------------------------------------------------

/// Fan-out bus for [`CommentCreatedEvent`]s, shared as `Arc<CommentBus>`.
#[derive(Debug, Default)]
pub struct CommentBus {
    topics: RwLock<HashMap<DbId, Mutex<Subscribers>>>,
    closed: AtomicBool,
}

impl CommentBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `exercise_id`.
    ///
    /// On a closed bus the returned subscription is already finished.
    pub async fn subscribe(&self, exercise_id: DbId) -> Subscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        let handle = SubscriptionHandle {
            id: Uuid::new_v4(),
            exercise_id,
        };

        let mut topics = self.topics.write().await;
        if self.closed.load(Ordering::Acquire) {
            drop(tx);
        } else {
            topics
                .entry(exercise_id)
                .or_default()
                .get_mut()
                .insert(handle.id, tx);
            tracing::debug!(exercise_id, subscription_id = %handle.id, "Subscribed to comment bus");
        }

        Subscription { handle, receiver }
    }

    /// Remove a subscriber. Calling this again for the same handle is a no-op.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut topics = self.topics.write().await;
        let Some(topic) = topics.get_mut(&handle.exercise_id) else {
            return;
        };
        let subscribers = topic.get_mut();
        if subscribers.remove(&handle.id).is_some() {
            tracing::debug!(
                exercise_id = handle.exercise_id,
                subscription_id = %handle.id,
                "Unsubscribed from comment bus",
            );
        }
        if subscribers.is_empty() {
            topics.remove(&handle.exercise_id);
        }
    }

    /// Deliver `event` to every current subscriber of its exercise.
    ///
    /// Returns the number of subscribers the event was queued for. Never
    /// waits on subscriber processing.
    pub async fn publish(&self, event: CommentCreatedEvent) -> usize {
        let topics = self.topics.read().await;
        let Some(topic) = topics.get(&event.exercise_id) else {
            return 0;
        };

        let mut subscribers = topic.lock().await;
        let mut delivered = 0;
        subscribers.retain(|id, tx| match tx.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::debug!(subscription_id = %id, "Pruned subscriber with closed receiver");
                false
            }
        });

        tracing::debug!(
            exercise_id = event.exercise_id,
            comment_id = event.comment_id,
            delivered,
            "Published comment event",
        );
        delivered
    }

    /// Number of live subscribers for an exercise.
    pub async fn subscriber_count(&self, exercise_id: DbId) -> usize {
        let topics = self.topics.read().await;
        match topics.get(&exercise_id) {
            Some(topic) => topic.lock().await.len(),
            None => 0,
        }
    }

    /// Drop every subscriber and refuse new ones.
    ///
    /// Each open [`Subscription`] then yields `None`, which ends the delivery
    /// loops built on it.
    pub async fn close(&self) {
        let mut topics = self.topics.write().await;
        self.closed.store(true, Ordering::Release);
        let count: usize = topics.values_mut().map(|t| t.get_mut().len()).sum();
        topics.clear();
        tracing::info!(count, "Closed comment bus");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn event(comment_id: DbId, exercise_id: DbId) -> CommentCreatedEvent {
        CommentCreatedEvent::new(comment_id, exercise_id, format!("c{comment_id}"), Utc::now())
    }

    #[tokio::test]
    async fn publish_reaches_subscriber_of_same_exercise_only() {
        let bus = CommentBus::new();
        let mut on_42 = bus.subscribe(42).await;
        let mut on_43 = bus.subscribe(43).await;

        assert_eq!(bus.publish(event(1, 42)).await, 1);

        assert_eq!(on_42.recv().await.map(|e| e.comment_id), Some(1));
        assert!(on_43.try_recv().is_none());
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = CommentBus::new();
        let mut sub = bus.subscribe(1).await;

        for id in 1..=3 {
            bus.publish(event(id, 1)).await;
        }

        let mut seen = Vec::new();
        while let Some(e) = sub.try_recv() {
            seen.push(e.comment_id);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let bus = CommentBus::new();
        let mut sub = bus.subscribe(7).await;
        let handle = sub.handle();

        bus.unsubscribe(handle).await;
        bus.unsubscribe(handle).await;

        assert_eq!(bus.publish(event(1, 7)).await, 0);
        assert_eq!(sub.recv().await, None);
        assert_eq!(bus.subscriber_count(7).await, 0);
    }

    #[tokio::test]
    async fn empty_topic_removed_after_last_unsubscribe() {
        let bus = CommentBus::new();
        let a = bus.subscribe(5).await;
        let b = bus.subscribe(5).await;
        assert_eq!(bus.subscriber_count(5).await, 2);

        bus.unsubscribe(a.handle()).await;
        assert_eq!(bus.subscriber_count(5).await, 1);
        bus.unsubscribe(b.handle()).await;
        assert!(bus.topics.read().await.is_empty());
    }

    #[tokio::test]
    async fn dropped_receiver_pruned_on_publish() {
        let bus = CommentBus::new();
        let sub = bus.subscribe(3).await;
        drop(sub);

        assert_eq!(bus.publish(event(1, 3)).await, 0);
        assert_eq!(bus.subscriber_count(3).await, 0);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = CommentBus::new();
        assert_eq!(bus.publish(event(1, 99)).await, 0);
    }

    #[tokio::test]
    async fn close_ends_subscriptions_and_rejects_new_ones() {
        let bus = CommentBus::new();
        let mut before = bus.subscribe(1).await;

        bus.close().await;
        assert!(bus.is_closed());
        assert_eq!(before.recv().await, None);

        let mut after = bus.subscribe(1).await;
        assert_eq!(after.recv().await, None);
        assert_eq!(bus.publish(event(1, 1)).await, 0);
    }

    #[test]
    fn event_serializes_with_snake_case_fields() {
        let e = event(9, 42).with_author(7, Some("ada".to_string()));
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["comment_id"], 9);
        assert_eq!(json["exercise_id"], 42);
        assert_eq!(json["author_id"], 7);
        assert_eq!(json["username"], "ada");
    }
}
