//! Agent endpoint: handshake, telemetry fan-out, lifecycle.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::mpsc;

use omnihub_protocol::{ProtocolError, Registration};

use crate::api::AppState;

use super::hub::{CONNECTION_BUFFER_SIZE, WsHub};
use super::registry::AgentSession;

/// WebSocket upgrade handler.
///
/// GET /ws/agent
pub async fn agent_ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_agent_connection(socket, hub))
}

/// Drive one agent connection from handshake to teardown.
async fn handle_agent_connection(socket: WebSocket, hub: Arc<WsHub>) {
    let (mut sender, mut receiver) = socket.split();

    // Exactly one message is read as the registration handshake; a
    // connection that cannot produce one is closed unregistered.
    let registration = match read_handshake(&mut receiver).await {
        Ok(registration) => registration,
        Err(err) => {
            warn!("Rejecting agent connection: {err}");
            let _ = sender.close().await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel(CONNECTION_BUFFER_SIZE);
    let session = AgentSession::new(registration, tx);
    let device_id = session.device_id.clone();
    let token = session.session;

    info!(
        "Agent {} registered with platform: {}",
        device_id, session.platform
    );
    hub.registry().register_agent(session);
    hub.broadcast_device_list();

    // Writer task: drains the outbound channel into the socket so routed
    // commands never block the hub on this peer.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                // Validate only; dashboards receive the agent's bytes
                // untouched.
                match serde_json::from_str::<Value>(text.as_str()) {
                    Ok(envelope) => {
                        debug!(
                            "Received from {device_id}: {}",
                            envelope.get("type").and_then(Value::as_str).unwrap_or("unknown")
                        );
                        hub.broadcast_to_dashboards(text.as_str());
                    }
                    Err(err) => {
                        debug!("Dropping malformed envelope from agent {device_id}: {err}");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary frame from agent {device_id}");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Agent {device_id} disconnected");
                break;
            }
            Err(err) => {
                warn!("WebSocket error for agent {device_id}: {err}");
                break;
            }
        }
    }

    send_task.abort();

    // Guarded removal: if this connection was overwritten by a newer
    // registration, the entry belongs to the replacement and the device
    // list is unchanged.
    if hub.registry().deregister_session(&device_id, token) {
        hub.broadcast_device_list();
    }
}

/// Read the first data frame and parse it as a registration.
async fn read_handshake(
    receiver: &mut SplitStream<WebSocket>,
) -> Result<Registration, ProtocolError> {
    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => return Registration::parse(text.as_str()),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(_) => {
                return Err(ProtocolError::MalformedHandshake(
                    "expected a text frame".to_string(),
                ));
            }
            Err(err) => return Err(ProtocolError::MalformedHandshake(err.to_string())),
        }
    }

    Err(ProtocolError::MalformedHandshake(
        "connection closed before handshake".to_string(),
    ))
}
