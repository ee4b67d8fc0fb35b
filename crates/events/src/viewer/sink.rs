//! Viewer delivery sink: bridges one bus subscription to one viewer context.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tutor_core::types::DbId;

use crate::bus::{CommentBus, Subscription, SubscriptionHandle};
use crate::viewer::context::ViewerHandle;

/// Forwards every event published for one exercise into one viewer context.
///
/// Created by [`ViewerSink::attach`], which subscribes immediately. Call
/// [`ViewerSink::detach`] on view teardown; dropping the sink stops delivery
/// too, with the unsubscribe finishing in the background.
pub struct ViewerSink {
    bus: Arc<CommentBus>,
    subscription: SubscriptionHandle,
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

impl ViewerSink {
    pub async fn attach(bus: Arc<CommentBus>, exercise_id: DbId, viewer: ViewerHandle) -> Self {
        let subscription = bus.subscribe(exercise_id).await;
        let handle = subscription.handle();
        let cancel = CancellationToken::new();

        tracing::debug!(
            exercise_id,
            viewer_id = %viewer.id(),
            subscription_id = %handle.id,
            "Viewer sink attached",
        );

        let pump = tokio::spawn(pump(
            Arc::clone(&bus),
            subscription,
            viewer,
            cancel.clone(),
        ));

        Self {
            bus,
            subscription: handle,
            cancel,
            pump,
        }
    }

    pub fn exercise_id(&self) -> DbId {
        self.subscription.exercise_id
    }

    /// Unsubscribe and wait for the delivery loop to finish.
    pub async fn detach(mut self) {
        self.bus.unsubscribe(self.subscription).await;
        self.cancel.cancel();
        if let Err(e) = (&mut self.pump).await {
            tracing::warn!(error = %e, "Viewer sink delivery loop failed");
        }
        tracing::debug!(subscription_id = %self.subscription.id, "Viewer sink detached");
    }
}

impl Drop for ViewerSink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Move events from the subscription into the viewer queue, in order.
async fn pump(
    bus: Arc<CommentBus>,
    mut subscription: Subscription,
    viewer: ViewerHandle,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = subscription.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let comment_id = event.comment_id;
        if let Err(e) = viewer.comment_created(event) {
            // The viewer is gone; nothing left to deliver to.
            tracing::debug!(comment_id, error = %e, "Dropped comment delivery");
            break;
        }
    }

    bus.unsubscribe(subscription.handle()).await;
}
