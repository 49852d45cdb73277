//! WebSocket hub for relaying between agents and dashboards.
//!
//! Agents on managed machines dial out to the hub and register under a
//! device identifier; dashboards connect anonymously to observe and
//! control them. The hub routes by device identity only.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐        ┌───────────────┐        ┌───────────────┐
//! │   Agent A     │        │   Agent B     │        │   Agent C     │
//! │  (register,   │        │  (register,   │        │  (register,   │
//! │   telemetry)  │        │   telemetry)  │        │   telemetry)  │
//! └───────┬───────┘        └───────┬───────┘        └───────┬───────┘
//!         │ /ws/agent              │                        │
//! ┌───────▼────────────────────────▼────────────────────────▼───────┐
//! │                            WsHub                                │
//! │  - Registry: device_id -> agent session, dashboard set          │
//! │  - fan-out: agent messages broadcast verbatim to dashboards     │
//! │  - directed routing: dashboard commands to one named agent      │
//! └───────┬────────────────────────┬────────────────────────┬───────┘
//!         │ /ws/dashboard          │                        │
//! ┌───────▼───────┐        ┌───────▼───────┐        ┌───────▼───────┐
//! │  Dashboard 1  │        │  Dashboard 2  │        │  Dashboard 3  │
//! └───────────────┘        └───────────────┘        └───────────────┘
//! ```
//!
//! One tokio task per connection; connection loops share state only
//! through the [`Registry`] and each other's bounded outbound channels, so
//! a slow or dead peer never stalls anyone else.

mod agent;
mod dashboard;
mod hub;
mod registry;

pub use agent::agent_ws_handler;
pub use dashboard::dashboard_ws_handler;
pub use hub::{RoutingError, WsHub};
pub use registry::{AgentInfo, AgentSession, DashboardSession, Registry, WsSender};
