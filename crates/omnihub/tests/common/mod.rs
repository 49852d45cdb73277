//! Test utilities and common setup.

use std::net::SocketAddr;

use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use omnihub::api::{AppState, create_router};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a test application router with fresh state.
pub fn test_app() -> Router {
    create_router(AppState::new())
}

/// Bind an ephemeral listener and serve the app in the background.
pub async fn spawn_app() -> SocketAddr {
    let app = test_app();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Open an agent connection without sending the handshake.
pub async fn connect_raw_agent(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/agent")).await.unwrap();
    ws
}

/// Open an agent connection and complete the registration handshake.
pub async fn connect_agent(addr: SocketAddr, device_id: &str) -> WsClient {
    let mut ws = connect_raw_agent(addr).await;
    let register = json!({
        "type": "register",
        "device_id": device_id,
        "platform": "linux",
        "system_info": {"hostname": device_id},
    });
    ws.send(Message::Text(register.to_string().into()))
        .await
        .unwrap();
    ws
}

/// Open a dashboard connection and read the initial device-list snapshot.
pub async fn connect_dashboard(addr: SocketAddr) -> (WsClient, Value) {
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws/dashboard"))
        .await
        .unwrap();
    let snapshot = recv_json(&mut ws).await;
    (ws, snapshot)
}

/// Receive the next text frame verbatim, panicking after a timeout.
pub async fn recv_text(ws: &mut WsClient) -> String {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("connection closed")
            .expect("transport error");
        match frame {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Receive the next text frame parsed as JSON.
pub async fn recv_json(ws: &mut WsClient) -> Value {
    let text = recv_text(ws).await;
    serde_json::from_str(&text).unwrap()
}

/// Assert the next frame is a device-list event naming exactly `devices`.
pub async fn expect_device_list(ws: &mut WsClient, devices: &[&str]) {
    let event = recv_json(ws).await;
    assert_eq!(event["type"], "device_list", "unexpected event: {event}");
    let got: Vec<&str> = event["devices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap())
        .collect();
    let mut want = devices.to_vec();
    want.sort_unstable();
    assert_eq!(got, want);
}

/// Assert that no data frame arrives within the window.
pub async fn assert_silent(ws: &mut WsClient, window: Duration) {
    match timeout(window, ws.next()).await {
        Err(_) => {}
        Ok(None) => {}
        Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
        Ok(Some(frame)) => panic!("expected silence, got {frame:?}"),
    }
}
