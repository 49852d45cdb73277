//! Router/broadcaster over the connection registry.

use axum::extract::ws::Message;
use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;

use omnihub_protocol::DashboardEvent;

use super::registry::Registry;

/// Size of the per-connection send buffer.
pub(crate) const CONNECTION_BUFFER_SIZE: usize = 64;

/// Why a dashboard-issued message could not be delivered to its target.
///
/// Both variants surface to the originating dashboard as the same `error`
/// envelope; a send failure does not deregister the agent (only its own
/// receive loop does that).
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no agent registered as {0}")]
    UnknownDevice(String),

    #[error("agent {0} is not accepting messages")]
    SendFailed(String),
}

/// The behavioral core of the hub: fan-out to dashboards and directed
/// delivery to agents, on top of the [`Registry`].
///
/// Every send is non-blocking (`try_send` into a bounded per-connection
/// channel drained by that connection's writer task), so broadcasting never
/// stalls on a slow or dead peer and no lock is held across a send.
pub struct WsHub {
    registry: Registry,
}

impl WsHub {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Send a payload to every connected dashboard independently.
    ///
    /// A failure for one dashboard is logged and skipped; it neither aborts
    /// the rest of the fan-out nor removes the session. Removal happens
    /// only when that dashboard's own receive loop terminates.
    pub fn broadcast_to_dashboards(&self, payload: &str) {
        let message = Message::Text(payload.to_string().into());
        for sender in self.registry.dashboard_senders() {
            if sender.try_send(message.clone()).is_err() {
                debug!("Dropping broadcast to unresponsive dashboard");
            }
        }
    }

    /// Broadcast the current device list to all dashboards.
    pub fn broadcast_device_list(&self) {
        let event = DashboardEvent::DeviceList {
            devices: self.registry.device_ids(),
        };
        match serde_json::to_string(&event) {
            Ok(json) => self.broadcast_to_dashboards(&json),
            Err(err) => warn!("Failed to serialize device list: {err}"),
        }
    }

    /// Deliver an envelope to the one agent registered under `device_id`.
    pub fn route_to_agent(&self, device_id: &str, envelope: &Value) -> Result<(), RoutingError> {
        let Some(sender) = self.registry.lookup_agent(device_id) else {
            return Err(RoutingError::UnknownDevice(device_id.to_string()));
        };

        sender
            .try_send(Message::Text(envelope.to_string().into()))
            .map_err(|_| RoutingError::SendFailed(device_id.to_string()))
    }
}

impl Default for WsHub {
    fn default() -> Self {
        Self::new()
    }
}
