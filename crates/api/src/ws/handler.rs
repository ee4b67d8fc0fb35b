use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tutor_core::types::DbId;
use tutor_events::{ViewerContext, ViewerSink};

use super::live::LivePanel;
use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/exercises/{id}/comments/live
///
/// Upgrades to a WebSocket that receives the refreshed first page of the
/// thread every time a comment is posted on the exercise. Exercises that do
/// not accept comments are refused before the upgrade.
pub async fn live_comments(
    State(state): State<AppState>,
    Path(exercise_id): Path<DbId>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    state.comments.ensure_commentable(exercise_id).await?;
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, exercise_id)))
}

/// Manage one live viewer after upgrade.
///
///   1. Start the viewer context and attach its sink to the bus.
///   2. Queue an initial snapshot.
///   3. Forward panel frames to the socket on a sender task.
///   4. Read inbound frames until close, error or server shutdown.
///   5. Detach the sink, then dispose the context.
async fn handle_socket(socket: WebSocket, state: AppState, exercise_id: DbId) {
    let conn_id = uuid::Uuid::new_v4();
    tracing::info!(%conn_id, exercise_id, "Live viewer connected");

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let context = ViewerContext::spawn(LivePanel::new(
        exercise_id,
        Arc::clone(&state.comments),
        tx,
    ));
    let viewer = context.handle();
    let sink = ViewerSink::attach(Arc::clone(&state.bus), exercise_id, viewer.clone()).await;
    if let Err(e) = viewer.refresh() {
        tracing::debug!(%conn_id, error = %e, "Initial snapshot not queued");
    }

    let (mut ws_sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sink.send(msg).await.is_err() {
                tracing::debug!(%conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    loop {
        let frame = tokio::select! {
            _ = state.shutdown.cancelled() => {
                tracing::debug!(%conn_id, "Server shutting down, closing live viewer");
                break;
            }
            frame = stream.next() => frame,
        };

        match frame {
            None | Some(Ok(Message::Close(_))) => break,
            Some(Ok(Message::Text(text))) if text.as_str().trim() == "refresh" => {
                if viewer.refresh().is_err() {
                    break;
                }
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    sink.detach().await;
    match context.shutdown().await {
        Ok(panel) => tracing::info!(%conn_id, exercise_id, frames = panel.sent(), "Live viewer disconnected"),
        Err(e) => tracing::warn!(%conn_id, error = %e, "Live viewer context failed"),
    }
    send_task.abort();
}
