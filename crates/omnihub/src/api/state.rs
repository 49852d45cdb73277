//! Application state shared across handlers.

use std::sync::Arc;

use crate::ws::WsHub;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// WebSocket hub for agent/dashboard routing.
    pub hub: Arc<WsHub>,
}

impl AppState {
    /// Create new application state.
    pub fn new() -> Self {
        Self {
            hub: Arc::new(WsHub::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
