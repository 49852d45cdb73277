//! Protocol-level error types.

use thiserror::Error;

/// Errors produced while decoding wire envelopes.
///
/// A malformed handshake rejects the connection before registration; a
/// malformed envelope on an established connection is logged by the caller
/// and the connection keeps running.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}
