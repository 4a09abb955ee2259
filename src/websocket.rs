//! `/ws` connection lifecycle.
//!
//! Each connection gets a fresh session id, announced as the first frame.
//! Frames from the browser are read only to notice disconnects.

use crate::messages::ServerMessage;
use crate::registry::SessionRegistry;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

pub async fn handle_ws_connection(socket: WebSocket, registry: SessionRegistry) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut outbound = registry.register(&session_id);
    registry.deliver(ServerMessage::hello(&session_id), Some(&session_id));

    // Forward registry deliveries to the socket until either side goes away.
    let send_session = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if ws_tx.send(Message::Text(msg.to_json())).await.is_err() {
                debug!(session_id = %send_session, "WebSocket send failed");
                break;
            }
        }
    });

    let recv_session = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(Message::Close(_)) => break,
                Ok(_) => debug!(session_id = %recv_session, "Ignoring client frame"),
                Err(e) => {
                    debug!(session_id = %recv_session, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.unregister(&session_id);
    info!(session_id = %session_id, "WebSocket connection closed");
}
