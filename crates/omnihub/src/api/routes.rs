//! API route definitions.

use axum::http::{HeaderValue, Method};
use axum::{Router, routing::get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::ws::{agent_ws_handler, dashboard_ws_handler};

use super::handlers;
use super::state::AppState;

/// Create the application router with the default (allow-any) CORS policy.
pub fn create_router(state: AppState) -> Router {
    create_router_with_origins(state, &[])
}

/// Create the application router, restricting CORS to the given origins
/// when any are configured.
pub fn create_router_with_origins(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = build_cors_layer(allowed_origins);

    // Tracing layer with request timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(handlers::status))
        .route("/health", get(handlers::health))
        .route("/agents", get(handlers::list_agents))
        .route("/ws/agent", get(agent_ws_handler))
        .route("/ws/dashboard", get(dashboard_ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer based on configuration.
///
/// With no configured origins, any origin may connect (dashboards are
/// anonymous observers and may be served from anywhere). Configured
/// origins switch the layer to an explicit allowlist.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: all configured origins are invalid!");
        CorsLayer::new().allow_origin(AllowOrigin::exact(
            HeaderValue::from_static("null"), // This effectively denies all CORS
        ))
    } else {
        tracing::info!("CORS: allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
