//! Route definitions for sensor queries.

use axum::routing::get;
use axum::Router;

use crate::handlers::sensors;
use crate::state::AppState;

/// Sensor routes mounted at `/sensors`.
///
/// ```text
/// GET /               -> list_sensors
/// GET /latest         -> latest_readings
/// GET /{id}/readings  -> reading_history
/// GET /{id}/stats     -> reading_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sensors::list_sensors))
        .route("/latest", get(sensors::latest_readings))
        .route("/{id}/readings", get(sensors::reading_history))
        .route("/{id}/stats", get(sensors::reading_stats))
}
