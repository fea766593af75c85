//! Telemetry ingestion pipeline.
//!
//! Transport listeners feed raw frames into the [`router::IngestionRouter`],
//! which normalizes payloads, evaluates thresholds, appends to the event
//! store, updates the in-memory live state, and publishes notifications on
//! the [`bus::TelemetryBus`].

pub mod bus;
pub mod live;
pub mod registry;
pub mod router;
pub mod store;
pub mod transport;
