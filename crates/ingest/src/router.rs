//! Ingestion router: one inbound frame in, evaluated state out.
//!
//! For every transport frame the router normalizes the payload, resolves
//! the sensor against the registry, evaluates the threshold, appends to
//! the event store, updates [`LiveState`], and notifies the bus. A
//! failure in any one stage never takes the pipeline down; bad messages
//! are dropped with a warning and store failures are logged while the
//! live path continues.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use linewatch_core::normalize::{classify, InboundMessage, SensorRef};
use linewatch_core::reading::{SensorReading, Status};
use linewatch_core::threshold::evaluate;
use linewatch_core::types::{DbId, SYSTEM_USER_ID};
use linewatch_db::models::Sensor;
use serde_json::Value;

use crate::bus::{TelemetryBus, TelemetryEvent};
use crate::live::{LiveState, SensorLive};
use crate::registry::SensorRegistry;
use crate::store::{EventStore, StoreError};

/// Default upper bound on a single store write.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the router did with a frame. Returned for observability; the
/// router itself never propagates per-message failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Reading evaluated and applied; an alert was also raised when the
    /// status is out of range.
    Accepted { sensor_id: DbId, status: Status },
    /// A pre-formed alert was recorded.
    AlertRecorded { sensor_id: DbId },
    /// The frame was dropped (unparseable, unknown sensor, or a
    /// registry failure).
    Dropped,
}

pub struct IngestionRouter {
    registry: Arc<SensorRegistry>,
    store: Arc<dyn EventStore>,
    live: Arc<LiveState>,
    bus: Arc<TelemetryBus>,
    store_timeout: Duration,
}

impl IngestionRouter {
    pub fn new(
        registry: Arc<SensorRegistry>,
        store: Arc<dyn EventStore>,
        live: Arc<LiveState>,
        bus: Arc<TelemetryBus>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            live,
            bus,
            store_timeout,
        }
    }

    /// Process one raw transport frame.
    pub async fn accept(&self, topic: &str, payload: &Value) -> Outcome {
        let message = match classify(topic, payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(topic, %error, "Dropping unparseable frame");
                return Outcome::Dropped;
            }
        };

        match message {
            InboundMessage::Reading {
                sensor,
                value,
                recorded_at,
            } => {
                let Some(sensor) = self.resolve(topic, &sensor).await else {
                    return Outcome::Dropped;
                };
                let recorded_at = recorded_at.unwrap_or_else(Utc::now);
                self.handle_reading(sensor, value, recorded_at).await
            }
            InboundMessage::Alert {
                sensor_id,
                description,
            } => self.handle_alert(topic, sensor_id, &description).await,
        }
    }

    /// Resolve a sensor reference to a registered sensor, or drop.
    async fn resolve(&self, topic: &str, sensor: &SensorRef) -> Option<Sensor> {
        let looked_up = match sensor {
            SensorRef::Id(id) => self.registry.sensor(*id).await,
            SensorRef::Name(name) => self.registry.sensor_by_name(name).await,
        };
        match looked_up {
            Ok(Some(sensor)) => Some(sensor),
            Ok(None) => {
                tracing::warn!(topic, ?sensor, "Dropping frame for unknown sensor");
                None
            }
            Err(error) => {
                tracing::error!(topic, %error, "Registry lookup failed, dropping frame");
                None
            }
        }
    }

    async fn handle_reading(
        &self,
        sensor: Sensor,
        value: f64,
        recorded_at: linewatch_core::types::Timestamp,
    ) -> Outcome {
        let bounds = match self.registry.bounds(sensor.id).await {
            Ok(bounds) => bounds,
            Err(error) => {
                tracing::error!(sensor_id = sensor.id, %error, "Bounds lookup failed, dropping frame");
                return Outcome::Dropped;
            }
        };

        let status = evaluate(value, bounds.as_ref());

        // Persist first; live state and notifications proceed even when
        // the write fails, so the dashboard stays current.
        if let Err(error) = self
            .timed_write(self.store.append_reading(sensor.id, value, recorded_at))
            .await
        {
            tracing::error!(sensor_id = sensor.id, %error, "Failed to store reading");
        }

        if status != Status::Normal {
            let description = self.alert_description(&sensor, value, status, bounds.as_ref()).await;
            if let Err(error) = self
                .timed_write(self.store.append_alert(
                    sensor.id,
                    &description,
                    SYSTEM_USER_ID,
                    recorded_at,
                ))
                .await
            {
                tracing::error!(sensor_id = sensor.id, %error, "Failed to store alert");
            } else {
                self.bus
                    .publish(TelemetryEvent::AlertRaised { sensor_id: sensor.id });
            }
        }

        self.live
            .apply(SensorLive {
                reading: SensorReading {
                    sensor_id: sensor.id,
                    value,
                    recorded_at,
                },
                status,
                bounds,
            })
            .await;

        self.bus.publish(TelemetryEvent::ReadingAccepted {
            sensor_id: sensor.id,
            status,
        });

        Outcome::Accepted {
            sensor_id: sensor.id,
            status,
        }
    }

    async fn handle_alert(&self, topic: &str, sensor_id: DbId, description: &str) -> Outcome {
        match self.registry.sensor(sensor_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(topic, sensor_id, "Dropping alert for unknown sensor");
                return Outcome::Dropped;
            }
            Err(error) => {
                tracing::error!(topic, %error, "Registry lookup failed, dropping alert");
                return Outcome::Dropped;
            }
        }

        if let Err(error) = self
            .timed_write(
                self.store
                    .append_alert(sensor_id, description, SYSTEM_USER_ID, Utc::now()),
            )
            .await
        {
            tracing::error!(sensor_id, %error, "Failed to store alert");
            return Outcome::Dropped;
        }

        self.bus.publish(TelemetryEvent::AlertRaised { sensor_id });
        Outcome::AlertRecorded { sensor_id }
    }

    /// Describe an out-of-range reading for the alert log.
    async fn alert_description(
        &self,
        sensor: &Sensor,
        value: f64,
        status: Status,
        bounds: Option<&linewatch_core::reading::OperatingBounds>,
    ) -> String {
        let location = match self.registry.location_name(sensor.id).await {
            Ok(Some(name)) => name,
            _ => "unknown location".to_string(),
        };
        let (direction, limit) = match (status, bounds) {
            (Status::Low, Some(b)) => ("below allowed minimum", b.min_value),
            (Status::High, Some(b)) => ("above allowed maximum", b.max_value),
            // Out-of-range status implies bounds were present.
            _ => ("outside allowed range", value),
        };
        format!(
            "value {value} {direction} {limit} for sensor '{}' ({location})",
            sensor.name
        )
    }

    async fn timed_write(
        &self,
        write: impl std::future::Future<Output = Result<(), StoreError>>,
    ) -> Result<(), StoreError> {
        tokio::time::timeout(self.store_timeout, write)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
