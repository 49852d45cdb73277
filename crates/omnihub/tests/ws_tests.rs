//! End-to-end WebSocket tests against a live hub.
//!
//! Each test spawns the server on an ephemeral port and drives real agent
//! and dashboard connections with tokio-tungstenite. Device-list pushes
//! double as synchronization points: once a dashboard has seen a list
//! naming a device, that device's registration is visible to the router.

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;

mod common;
use common::{
    assert_silent, connect_agent, connect_dashboard, connect_raw_agent, expect_device_list,
    recv_json, recv_text, spawn_app,
};

const SILENCE: Duration = Duration::from_millis(300);

/// A dashboard receives the device-list snapshot immediately on connect.
#[tokio::test]
async fn test_dashboard_receives_snapshot_on_connect() {
    let addr = spawn_app().await;

    let (_dash, snapshot) = connect_dashboard(addr).await;
    assert_eq!(snapshot, json!({"type": "device_list", "devices": []}));
}

/// Agent registration pushes an updated device list to every dashboard.
#[tokio::test]
async fn test_registration_broadcasts_device_list() {
    let addr = spawn_app().await;

    let (mut dash_1, _) = connect_dashboard(addr).await;
    let (mut dash_2, _) = connect_dashboard(addr).await;

    let _agent = connect_agent(addr, "dev-1").await;

    expect_device_list(&mut dash_1, &["dev-1"]).await;
    expect_device_list(&mut dash_2, &["dev-1"]).await;
}

/// Re-registration under the same device id replaces the session: the list
/// names the id exactly once and commands reach the new connection only.
#[tokio::test]
async fn test_reregistration_replaces_session() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;

    let mut agent_old = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    let mut agent_new = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    dash.send(Message::Text(
        json!({"type": "command", "target": "dev-1", "cmd": "whoami", "request_id": 1})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    let delivered = recv_json(&mut agent_new).await;
    assert_eq!(
        delivered,
        json!({"type": "execute", "cmd": "whoami", "request_id": 1})
    );
    assert_silent(&mut agent_old, SILENCE).await;
}

/// One agent message reaches every connected dashboard byte-identically; a
/// dashboard that already disconnected receives nothing.
#[tokio::test]
async fn test_fan_out_reaches_every_dashboard() {
    let addr = spawn_app().await;

    let (mut dash_1, _) = connect_dashboard(addr).await;
    let (mut dash_2, _) = connect_dashboard(addr).await;
    let (mut dash_3, _) = connect_dashboard(addr).await;

    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash_1, &["dev-1"]).await;
    expect_device_list(&mut dash_2, &["dev-1"]).await;
    expect_device_list(&mut dash_3, &["dev-1"]).await;

    // A fourth dashboard connects and goes away again before the message.
    let (mut dash_gone, _) = connect_dashboard(addr).await;
    dash_gone.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    agent
        .send(Message::Text(
            json!({"type": "stats", "cpu": 10}).to_string().into(),
        ))
        .await
        .unwrap();

    let payload_1 = recv_text(&mut dash_1).await;
    let payload_2 = recv_text(&mut dash_2).await;
    let payload_3 = recv_text(&mut dash_3).await;
    assert_eq!(payload_1, payload_2);
    assert_eq!(payload_2, payload_3);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&payload_1).unwrap(),
        json!({"type": "stats", "cpu": 10})
    );
}

/// A command is delivered to its target only, with the execute envelope.
#[tokio::test]
async fn test_directed_routing_targets_single_agent() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;
    let mut agent_1 = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;
    let mut agent_2 = connect_agent(addr, "dev-2").await;
    expect_device_list(&mut dash, &["dev-1", "dev-2"]).await;

    dash.send(Message::Text(
        json!({"type": "command", "target": "dev-1", "cmd": "ls", "request_id": 7})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    let delivered = recv_json(&mut agent_1).await;
    assert_eq!(
        delivered,
        json!({"type": "execute", "cmd": "ls", "request_id": 7})
    );
    assert_silent(&mut agent_2, SILENCE).await;
    // No error came back to the dashboard.
    assert_silent(&mut dash, SILENCE).await;
}

/// A request envelope is re-typed and extra fields pass through.
#[tokio::test]
async fn test_request_forwarding_passes_extra_fields() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;
    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    dash.send(Message::Text(
        json!({
            "type": "request",
            "target": "dev-1",
            "request_type": "screenshot",
            "request_id": "r-9",
            "quality": 80,
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    let delivered = recv_json(&mut agent).await;
    assert_eq!(
        delivered,
        json!({"type": "screenshot", "request_id": "r-9", "quality": 80})
    );
}

/// Targeting an unregistered device returns exactly one error envelope to
/// the originating dashboard and nothing to anyone else.
#[tokio::test]
async fn test_unknown_target_errors_to_sender_only() {
    let addr = spawn_app().await;

    let (mut dash_sender, _) = connect_dashboard(addr).await;
    let (mut dash_other, _) = connect_dashboard(addr).await;
    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash_sender, &["dev-1"]).await;
    expect_device_list(&mut dash_other, &["dev-1"]).await;

    dash_sender
        .send(Message::Text(
            json!({"type": "command", "target": "dev-9", "cmd": "ls", "request_id": 2})
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

    let error = recv_json(&mut dash_sender).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["target"], "dev-9");
    assert!(error["message"].as_str().unwrap().contains("dev-9"));

    assert_silent(&mut dash_sender, SILENCE).await;
    assert_silent(&mut dash_other, SILENCE).await;
    assert_silent(&mut agent, SILENCE).await;
}

/// Disconnecting an agent removes it from the registry and the next
/// device-list broadcast omits it.
#[tokio::test]
async fn test_disconnect_cleanup() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;
    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    agent.close(None).await.unwrap();
    expect_device_list(&mut dash, &[]).await;

    // Commands to the departed device now fail.
    dash.send(Message::Text(
        json!({"type": "command", "target": "dev-1", "cmd": "ls", "request_id": 3})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();
    let error = recv_json(&mut dash).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["target"], "dev-1");
}

/// Messages from one agent arrive at a dashboard in send order.
#[tokio::test]
async fn test_order_preservation() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;
    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    for seq in 1..=3 {
        agent
            .send(Message::Text(
                json!({"type": "stats", "seq": seq}).to_string().into(),
            ))
            .await
            .unwrap();
    }

    for seq in 1..=3 {
        let event = recv_json(&mut dash).await;
        assert_eq!(event["seq"], seq);
    }
}

/// A malformed envelope is dropped without killing the agent connection.
#[tokio::test]
async fn test_malformed_envelope_keeps_connection() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;
    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    agent
        .send(Message::Text("this is not json".to_string().into()))
        .await
        .unwrap();
    agent
        .send(Message::Text(
            json!({"type": "stats", "cpu": 10}).to_string().into(),
        ))
        .await
        .unwrap();

    // Only the valid message comes through, and the agent stays registered.
    let event = recv_json(&mut dash).await;
    assert_eq!(event, json!({"type": "stats", "cpu": 10}));
}

/// A dashboard message with an unknown type is ignored without a reply.
#[tokio::test]
async fn test_unknown_dashboard_message_is_ignored() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;
    let mut agent = connect_agent(addr, "dev-1").await;
    expect_device_list(&mut dash, &["dev-1"]).await;

    dash.send(Message::Text(
        json!({"type": "reboot-everything", "target": "dev-1"})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    assert_silent(&mut dash, SILENCE).await;
    assert_silent(&mut agent, SILENCE).await;
}

/// A handshake without the register tag still registers (legacy agents).
#[tokio::test]
async fn test_permissive_handshake_without_type() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;

    let mut agent = connect_raw_agent(addr).await;
    agent
        .send(Message::Text(
            json!({"device_id": "bare-1"}).to_string().into(),
        ))
        .await
        .unwrap();

    expect_device_list(&mut dash, &["bare-1"]).await;
}

/// A first message that is not a JSON object rejects the connection
/// without touching the registry.
#[tokio::test]
async fn test_malformed_handshake_rejects_connection() {
    let addr = spawn_app().await;

    let (mut dash, _) = connect_dashboard(addr).await;

    let mut agent = connect_raw_agent(addr).await;
    agent
        .send(Message::Text("[1,2,3]".to_string().into()))
        .await
        .unwrap();

    // The server closes the socket; the client sees close then end of
    // stream.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = agent.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => return true,
                _ => continue,
            }
        }
        true
    })
    .await
    .unwrap();
    assert!(closed);

    // No registration was broadcast.
    assert_silent(&mut dash, SILENCE).await;
}
