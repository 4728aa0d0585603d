//! WebSocket connection loop for one job subscriber.
//!
//! Attaches to the [`ProgressHub`], then forwards queued events to the
//! client until either side goes away.

use axum::extract::ws::WebSocket;
use futures_util::{SinkExt, StreamExt};

use super::messages::{ClientFrame, event_frame};
use crate::domain::JobId;
use crate::service::ProgressHub;

/// Runs the read/write loop for a single WebSocket subscriber.
///
/// - Subscribes to `job_id`; a cached event, if any, is the first frame.
/// - Forwards every published event as a JSON text frame.
/// - Ends when the client closes, a write fails, or the hub drops the
///   subscription. The subscription is always detached on exit.
pub async fn run_connection(socket: WebSocket, job_id: JobId, hub: ProgressHub) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subscriber = hub.connect(&job_id).await;
    let connection_id = subscriber.id();
    tracing::info!(%job_id, %connection_id, "ws subscriber connected");

    loop {
        tokio::select! {
            // Incoming frame from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(frame)) => match ClientFrame::classify(&frame) {
                        ClientFrame::Close => break,
                        ClientFrame::KeepAlive => {
                            tracing::trace!(%job_id, %connection_id, "keep-alive");
                        }
                        ClientFrame::Ignored => {}
                    },
                    Some(Err(err)) => {
                        tracing::debug!(%job_id, %connection_id, error = %err, "ws read failed");
                        break;
                    }
                    None => break,
                }
            }
            // Event from the hub
            event = subscriber.recv() => {
                let Some(event) = event else {
                    tracing::debug!(%job_id, %connection_id, "subscription ended by hub");
                    break;
                };
                let frame = match event_frame(&event) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(%job_id, error = %err, "dropping unencodable event");
                        continue;
                    }
                };
                if ws_tx.send(frame).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.disconnect(&job_id, subscriber).await;
    let _ = ws_tx.close().await;
    tracing::info!(%job_id, %connection_id, "ws subscriber disconnected");
}
