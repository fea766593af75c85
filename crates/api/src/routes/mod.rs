//! Route definitions, one module per resource.

pub mod alerts;
pub mod health;
pub mod sensors;

use axum::routing::any;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sensors", sensors::router())
        .nest("/alerts", alerts::router())
}

/// WebSocket feed routes mounted at root level.
///
/// ```text
/// GET /ws/{topic} -> feed_handler (dashboard | sensors | alerts)
/// ```
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws/{topic}", any(ws::feed_handler))
}
