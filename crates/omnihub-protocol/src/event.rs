//! Hub-originated envelopes pushed to dashboards.
//!
//! Agent telemetry and results are never re-encoded into these types; the
//! hub forwards the original text verbatim. Only messages the hub itself
//! authors live here.

use serde::Serialize;

/// Events the hub sends to dashboard connections.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// Snapshot of currently registered device identifiers. Pushed to a
    /// dashboard on connect and broadcast whenever the set changes.
    DeviceList { devices: Vec<String> },

    /// A command or request could not be delivered to its target.
    Error { message: String, target: String },
}
