use std::sync::Arc;

use linewatch_ingest::bus::TelemetryBus;
use linewatch_ingest::live::LiveState;
use linewatch_ingest::registry::SensorRegistry;

use crate::config::ServerConfig;
use crate::ws::manager::FeedManager;
use crate::ws::snapshots::SnapshotBroadcasters;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: linewatch_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live feed subscriber manager.
    pub feeds: Arc<FeedManager>,
    /// Per-topic snapshot broadcaster tasks.
    pub broadcasters: Arc<SnapshotBroadcasters>,
    /// In-memory latest reading per sensor.
    pub live: Arc<LiveState>,
    /// TTL-cached sensor registry.
    pub registry: Arc<SensorRegistry>,
    /// Pipeline notification bus.
    pub bus: Arc<TelemetryBus>,
}
