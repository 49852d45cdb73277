//! Dashboard-issued messages and the envelopes forwarded to agents.

use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Keys consumed by the hub for routing; everything else in a `request`
/// envelope is forwarded to the agent untouched.
const RESERVED_KEYS: [&str; 4] = ["type", "target", "request_type", "request_id"];

/// Messages a dashboard sends to the hub, tagged by `type`.
///
/// Any other `type`, or an envelope missing a required field, fails to
/// parse; callers log and drop those rather than surfacing an error to the
/// sender.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Run a shell command on the target agent.
    Command {
        target: String,
        cmd: String,
        /// Opaque correlation id, echoed back by the agent in its result.
        #[serde(default)]
        request_id: Value,
    },

    /// Invoke an arbitrary capability handler on the target agent. Extra
    /// fields are capability parameters and pass through verbatim.
    Request {
        target: String,
        request_type: String,
        #[serde(default)]
        request_id: Value,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

/// Build the envelope delivered to an agent for a `command`.
pub fn execute_envelope(cmd: &str, request_id: &Value) -> Value {
    json!({
        "type": "execute",
        "cmd": cmd,
        "request_id": request_id,
    })
}

/// Build the envelope delivered to an agent for a `request`.
///
/// The forwarded message is re-typed as the capability's `request_type`;
/// routing keys are stripped and every other field passes through.
pub fn request_envelope(request_type: &str, request_id: &Value, extra: &Map<String, Value>) -> Value {
    let mut fields = Map::new();
    fields.insert("type".to_string(), Value::String(request_type.to_string()));
    fields.insert("request_id".to_string(), request_id.clone());
    for (key, value) in extra {
        if !RESERVED_KEYS.contains(&key.as_str()) {
            fields.insert(key.clone(), value.clone());
        }
    }
    Value::Object(fields)
}
