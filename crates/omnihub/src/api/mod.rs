//! HTTP API module.
//!
//! Provides the status endpoints and the WebSocket upgrade routes.

mod handlers;
mod routes;
mod state;

pub use routes::{create_router, create_router_with_origins};
pub use state::AppState;
