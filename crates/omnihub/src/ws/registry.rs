//! Connection registry: who is online right now.

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use omnihub_protocol::Registration;

/// A sender for WebSocket messages to a specific connection.
pub type WsSender = mpsc::Sender<Message>;

/// Per-agent-connection record, created after a successful handshake.
#[derive(Debug, Clone)]
pub struct AgentSession {
    pub device_id: String,
    pub platform: String,
    pub system_info: Value,
    pub registered_at: DateTime<Utc>,
    /// Identifies this particular connection. Re-registration under the
    /// same device id mints a new token, so an abandoned connection's
    /// teardown can tell it no longer owns the registry entry.
    pub session: Uuid,
    pub sender: WsSender,
}

impl AgentSession {
    pub fn new(registration: Registration, sender: WsSender) -> Self {
        Self {
            device_id: registration.device_id,
            platform: registration.platform,
            system_info: registration.system_info,
            registered_at: Utc::now(),
            session: Uuid::new_v4(),
            sender,
        }
    }
}

/// Per-dashboard-connection record. Dashboards are anonymous observers;
/// there is nothing to keep beyond the send handle.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub sender: WsSender,
}

/// Metadata snapshot of a registered agent, for the HTTP status surface.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub device_id: String,
    pub platform: String,
    pub registered_at: DateTime<Utc>,
}

/// Process-wide connection state: device id -> agent session, plus the set
/// of active dashboard sessions.
///
/// All mutation goes through these methods; the maps themselves never
/// escape. Reads hand out snapshots (cloned senders or metadata), so no
/// caller can hold a map lock across a network send.
pub struct Registry {
    agents: DashMap<String, AgentSession>,
    dashboards: DashMap<Uuid, DashboardSession>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
            dashboards: DashMap::new(),
        }
    }

    /// Insert or overwrite the entry for the session's device id.
    ///
    /// A second registration under the same identifier replaces the
    /// existing entry; the old connection is abandoned here but not
    /// forcibly closed.
    pub fn register_agent(&self, session: AgentSession) {
        self.agents.insert(session.device_id.clone(), session);
    }

    /// Remove the entry for a device id. No-op if absent, which guards
    /// against double-disconnect races.
    pub fn deregister_agent(&self, device_id: &str) {
        self.agents.remove(device_id);
    }

    /// Remove the entry for a device id only if it still belongs to the
    /// given connection. Returns whether an entry was removed.
    ///
    /// Connection loops use this on teardown so a connection that was
    /// overwritten by re-registration cannot evict its replacement.
    pub fn deregister_session(&self, device_id: &str, session: Uuid) -> bool {
        self.agents
            .remove_if(device_id, |_, existing| existing.session == session)
            .is_some()
    }

    /// Look up the outbound handle for a device id.
    pub fn lookup_agent(&self, device_id: &str) -> Option<WsSender> {
        self.agents.get(device_id).map(|entry| entry.sender.clone())
    }

    /// Snapshot of registered device identifiers, sorted for stable output.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Snapshot of registered agent metadata, sorted by device id.
    pub fn agents(&self) -> Vec<AgentInfo> {
        let mut infos: Vec<AgentInfo> = self
            .agents
            .iter()
            .map(|entry| AgentInfo {
                device_id: entry.device_id.clone(),
                platform: entry.platform.clone(),
                registered_at: entry.registered_at,
            })
            .collect();
        infos.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        infos
    }

    /// Register a dashboard connection, returning its connection id.
    pub fn add_dashboard(&self, sender: WsSender) -> Uuid {
        let id = Uuid::new_v4();
        self.dashboards.insert(id, DashboardSession { sender });
        id
    }

    /// Remove a dashboard connection. No-op if already absent.
    pub fn remove_dashboard(&self, id: &Uuid) {
        self.dashboards.remove(id);
    }

    /// Snapshot of dashboard send handles for broadcasting.
    pub fn dashboard_senders(&self) -> Vec<WsSender> {
        self.dashboards
            .iter()
            .map(|entry| entry.sender.clone())
            .collect()
    }

    pub fn dashboard_count(&self) -> usize {
        self.dashboards.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
