//! Per-viewer single-threaded execution context.
//!
//! A [`ViewerContext`] is one spawned task that owns the viewer's panel state
//! and works through a command queue one item at a time. Anything that wants
//! to change what the viewer sees sends a [`ViewerCommand`] through a
//! [`ViewerHandle`]; nothing touches the panel from outside the task.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::CommentCreatedEvent;

/// UI-side state of one open exercise discussion.
///
/// Every method runs inside the owning [`ViewerContext`], never concurrently
/// with another call on the same panel.
#[async_trait]
pub trait CommentPanel: Send + 'static {
    /// A comment was created on the viewed exercise.
    async fn on_comment_created(&mut self, event: &CommentCreatedEvent);

    /// Re-render without a triggering event.
    async fn refresh(&mut self) {}

    /// The context is shutting down; no further calls follow.
    async fn on_detach(&mut self) {}
}

/// Work item marshaled onto a viewer context.
#[derive(Debug, Clone)]
pub enum ViewerCommand {
    CommentCreated(CommentCreatedEvent),
    Refresh,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("Viewer context {0} has been disposed")]
    ContextClosed(Uuid),
}

/// Cloneable sender side of a viewer context.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    id: Uuid,
    commands: mpsc::UnboundedSender<ViewerCommand>,
    cancel: CancellationToken,
}

impl ViewerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a command behind everything dispatched earlier.
    ///
    /// Fails once the context has been disposed.
    pub fn dispatch(&self, command: ViewerCommand) -> Result<(), ViewerError> {
        if self.cancel.is_cancelled() {
            return Err(ViewerError::ContextClosed(self.id));
        }
        self.commands
            .send(command)
            .map_err(|_| ViewerError::ContextClosed(self.id))
    }

    pub fn comment_created(&self, event: CommentCreatedEvent) -> Result<(), ViewerError> {
        self.dispatch(ViewerCommand::CommentCreated(event))
    }

    pub fn refresh(&self) -> Result<(), ViewerError> {
        self.dispatch(ViewerCommand::Refresh)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.commands.is_closed()
    }
}

/// Owner of a running viewer task.
pub struct ViewerContext<P: CommentPanel> {
    handle: ViewerHandle,
    task: JoinHandle<P>,
}

impl<P: CommentPanel> ViewerContext<P> {
    /// Start a context that owns `panel`.
    pub fn spawn(panel: P) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ViewerHandle {
            id: Uuid::new_v4(),
            commands: tx,
            cancel: CancellationToken::new(),
        };

        let task = tokio::spawn(run(panel, rx, handle.cancel.clone(), handle.id));
        tracing::debug!(viewer_id = %handle.id, "Viewer context started");

        Self { handle, task }
    }

    pub fn handle(&self) -> ViewerHandle {
        self.handle.clone()
    }

    /// Dispose the context and hand back the panel.
    ///
    /// Commands still queued are discarded; the one being processed, if
    /// any, finishes first.
    pub async fn shutdown(self) -> Result<P, JoinError> {
        self.handle.cancel.cancel();
        self.task.await
    }
}

async fn run<P: CommentPanel>(
    mut panel: P,
    mut commands: mpsc::UnboundedReceiver<ViewerCommand>,
    cancel: CancellationToken,
    viewer_id: Uuid,
) -> P {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(ViewerCommand::CommentCreated(event)) => {
                    panel.on_comment_created(&event).await;
                }
                Some(ViewerCommand::Refresh) => panel.refresh().await,
                None => break,
            },
        }
    }

    cancel.cancel();
    commands.close();
    panel.on_detach().await;
    tracing::debug!(viewer_id = %viewer_id, "Viewer context stopped");
    panel
}
