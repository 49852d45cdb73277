//! Agent registration handshake.

use serde_json::Value;

use crate::error::ProtocolError;

/// Parsed registration handshake, the first message an agent sends.
///
/// The wire form is permissive for compatibility with older agents: a
/// `{"type": "register", ...}` envelope is the documented shape, but any
/// JSON object carrying a `device_id` is accepted, and `device_id` itself
/// falls back to `"unknown"` when absent. Only a payload that is not a JSON
/// object at all is rejected.
#[derive(Debug, Clone)]
pub struct Registration {
    pub device_id: String,
    pub platform: String,
    pub system_info: Value,
}

impl Registration {
    /// Parse the first text frame of an agent connection.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| ProtocolError::MalformedHandshake(err.to_string()))?;

        let Some(fields) = value.as_object() else {
            return Err(ProtocolError::MalformedHandshake(
                "payload is not a JSON object".to_string(),
            ));
        };

        let device_id = fields
            .get("device_id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let platform = fields
            .get("platform")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let system_info = fields.get("system_info").cloned().unwrap_or(Value::Null);

        Ok(Self {
            device_id,
            platform,
            system_info,
        })
    }
}
