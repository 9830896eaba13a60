//! WebSocket handler for real-time job progress streaming.
//!
//! `GET /api/v1/jobs/:id/events` upgrades to a WebSocket. The handler
//! subscribes to the [`ProgressBus`] and forwards this job's events to the
//! client as JSON text frames, in emission order. A terminal event
//! (`job_completed` / `job_failed`) closes the stream.
//!
//! Lagged receivers are handled gracefully: the handler logs a warning and
//! keeps receiving; the client misses some events but catches up. A slow or
//! disconnecting client never affects the pipeline itself.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use toolsmith_types::event::ProgressEvent;
use uuid::Uuid;

use crate::state::AppState;

/// Upgrade an HTTP request to a WebSocket for one job's progress events.
pub async fn job_events(
    ws: WebSocketUpgrade,
    Path(job_id): Path<Uuid>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_job_events(socket, state, job_id))
}

async fn stream_job_events(socket: WebSocket, state: AppState, job_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.bus.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) if event.job_id() == job_id => {
                        let terminal = matches!(
                            event,
                            ProgressEvent::JobCompleted { .. } | ProgressEvent::JobFailed { .. }
                        );
                        match serde_json::to_string(&event) {
                            Ok(json) => {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                tracing::warn!("failed to serialize progress event: {err}");
                            }
                        }
                        if terminal {
                            break;
                        }
                    }
                    Ok(_) => {} // another job's event -- skip
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(job_id = %job_id, skipped = n, "event subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("websocket receive error: {err}");
                        break;
                    }
                    // Ignore client frames; the feed is one-way.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!(job_id = %job_id, "event stream closed");
}
