//! Canonical wire types for omnihub communication.
//!
//! Three legs share these envelopes:
//! - agent → hub: a one-shot registration handshake, then opaque JSON
//!   telemetry/result objects the hub forwards without inspection
//! - dashboard → hub: `command`/`request` envelopes naming a target device
//! - hub → dashboard: `device_list` pushes and routing `error` envelopes
//!
//! Every envelope is a JSON object in a WebSocket text frame. The hub
//! treats capability-specific parameters as opaque pass-through; only the
//! routing metadata (`type`, `target`, `request_type`, `request_id`) is
//! interpreted here.

mod command;
mod error;
mod event;
mod register;

pub use command::{DashboardMessage, execute_envelope, request_envelope};
pub use error::ProtocolError;
pub use event::DashboardEvent;
pub use register::Registration;
