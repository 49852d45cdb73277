//! Dashboard endpoint: device-list push, command/request routing.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;

use omnihub_protocol::{DashboardEvent, DashboardMessage, execute_envelope, request_envelope};

use crate::api::AppState;

use super::hub::{CONNECTION_BUFFER_SIZE, WsHub};
use super::registry::WsSender;

/// WebSocket upgrade handler.
///
/// GET /ws/dashboard
pub async fn dashboard_ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_dashboard_connection(socket, hub))
}

/// Drive one dashboard connection.
async fn handle_dashboard_connection(socket: WebSocket, hub: Arc<WsHub>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel(CONNECTION_BUFFER_SIZE);

    let conn_id = hub.registry().add_dashboard(tx.clone());
    info!("Dashboard {conn_id} connected");

    // Directed snapshot for this connection only, queued ahead of anything
    // the broadcaster enqueues afterward.
    let snapshot = DashboardEvent::DeviceList {
        devices: hub.registry().device_ids(),
    };
    send_event(&tx, &snapshot).await;

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
                match serde_json::from_str::<DashboardMessage>(text.as_str()) {
                    Ok(message) => dispatch(&hub, &tx, message).await,
                    // Unknown type or missing fields: dropped without a
                    // reply, matching the legacy dashboard contract.
                    Err(err) => debug!("Ignoring dashboard message: {err}"),
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary frame from dashboard {conn_id}");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Dashboard {conn_id} disconnected");
                break;
            }
            Err(err) => {
                warn!("WebSocket error for dashboard {conn_id}: {err}");
                break;
            }
        }
    }

    send_task.abort();
    hub.registry().remove_dashboard(&conn_id);
}

/// Forward a parsed dashboard message to its target agent, replying with an
/// error envelope to this dashboard alone when routing fails.
async fn dispatch(hub: &WsHub, reply: &WsSender, message: DashboardMessage) {
    match message {
        DashboardMessage::Command {
            target,
            cmd,
            request_id,
        } => {
            let envelope = execute_envelope(&cmd, &request_id);
            match hub.route_to_agent(&target, &envelope) {
                Ok(()) => info!("Command sent to {target}: {cmd}"),
                Err(err) => {
                    debug!("Command routing failed: {err}");
                    send_event(
                        reply,
                        &DashboardEvent::Error {
                            message: format!("Failed to send command to {target}"),
                            target,
                        },
                    )
                    .await;
                }
            }
        }

        DashboardMessage::Request {
            target,
            request_type,
            request_id,
            extra,
        } => {
            let envelope = request_envelope(&request_type, &request_id, &extra);
            match hub.route_to_agent(&target, &envelope) {
                Ok(()) => info!("Request sent to {target}: {request_type}"),
                Err(err) => {
                    debug!("Request routing failed: {err}");
                    send_event(
                        reply,
                        &DashboardEvent::Error {
                            message: format!("Failed to send request to {target}"),
                            target,
                        },
                    )
                    .await;
                }
            }
        }
    }
}

/// Serialize and queue a hub-authored event for one dashboard.
async fn send_event(reply: &WsSender, event: &DashboardEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            let _ = reply.send(Message::Text(json.into())).await;
        }
        Err(err) => warn!("Failed to serialize dashboard event: {err}"),
    }
}
