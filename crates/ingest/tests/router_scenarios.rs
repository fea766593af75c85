//! End-to-end router scenarios against in-memory registry and store
//! doubles. Each test pushes raw frames the way a transport listener
//! would and asserts on stored rows, live state, and bus notifications.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use linewatch_core::reading::{OperatingBounds, Status};
use linewatch_core::types::{DbId, Timestamp, SYSTEM_USER_ID};
use linewatch_db::models::Sensor;
use linewatch_ingest::bus::{TelemetryBus, TelemetryEvent};
use linewatch_ingest::live::LiveState;
use linewatch_ingest::registry::{RegistryError, RegistrySource, SensorRegistry};
use linewatch_ingest::router::{IngestionRouter, Outcome};
use linewatch_ingest::store::{EventStore, StoreError};
use serde_json::json;
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct StaticRegistry {
    sensors: Vec<Sensor>,
    bounds: Vec<(DbId, OperatingBounds)>,
}

impl StaticRegistry {
    fn extruder_fixture() -> Self {
        Self {
            sensors: vec![
                Sensor {
                    id: 1,
                    name: "extruder_temperature".to_string(),
                    location_id: 1,
                    active: true,
                },
                Sensor {
                    id: 2,
                    name: "draw_speed".to_string(),
                    location_id: 1,
                    active: false,
                },
            ],
            bounds: vec![
                (
                    1,
                    OperatingBounds {
                        min_value: 160.0,
                        max_value: 180.0,
                    },
                ),
                (
                    2,
                    OperatingBounds {
                        min_value: 30.0,
                        max_value: 40.0,
                    },
                ),
            ],
        }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistry {
    async fn fetch_sensor(&self, id: DbId) -> Result<Option<Sensor>, RegistryError> {
        Ok(self.sensors.iter().find(|s| s.id == id).cloned())
    }

    async fn fetch_sensor_by_name(&self, name: &str) -> Result<Option<Sensor>, RegistryError> {
        Ok(self.sensors.iter().find(|s| s.name == name).cloned())
    }

    async fn fetch_bounds(
        &self,
        sensor_id: DbId,
    ) -> Result<Option<OperatingBounds>, RegistryError> {
        Ok(self
            .bounds
            .iter()
            .find(|(id, _)| *id == sensor_id)
            .map(|(_, b)| *b))
    }

    async fn fetch_location_name(&self, _sensor_id: DbId) -> Result<Option<String>, RegistryError> {
        Ok(Some("extruder".to_string()))
    }

    async fn list_active_sensors(&self, location_id: DbId) -> Result<Vec<Sensor>, RegistryError> {
        Ok(self
            .sensors
            .iter()
            .filter(|s| s.active && s.location_id == location_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredReading {
    sensor_id: DbId,
    value: f64,
    recorded_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
struct StoredAlert {
    sensor_id: DbId,
    description: String,
    raised_by: DbId,
}

#[derive(Default)]
struct InMemoryStore {
    readings: Mutex<Vec<StoredReading>>,
    alerts: Mutex<Vec<StoredAlert>>,
    fail_writes: bool,
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append_reading(
        &self,
        sensor_id: DbId,
        value: f64,
        recorded_at: Timestamp,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Timeout);
        }
        self.readings.lock().await.push(StoredReading {
            sensor_id,
            value,
            recorded_at,
        });
        Ok(())
    }

    async fn append_alert(
        &self,
        sensor_id: DbId,
        description: &str,
        raised_by: DbId,
        _recorded_at: Timestamp,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Timeout);
        }
        self.alerts.lock().await.push(StoredAlert {
            sensor_id,
            description: description.to_string(),
            raised_by,
        });
        Ok(())
    }
}

struct Fixture {
    router: IngestionRouter,
    store: Arc<InMemoryStore>,
    live: Arc<LiveState>,
    bus: Arc<TelemetryBus>,
}

fn fixture_with_store(store: InMemoryStore) -> Fixture {
    let registry = Arc::new(SensorRegistry::new(
        Arc::new(StaticRegistry::extruder_fixture()),
        Duration::from_secs(30),
    ));
    let store = Arc::new(store);
    let live = Arc::new(LiveState::new());
    let bus = Arc::new(TelemetryBus::default());
    let router = IngestionRouter::new(
        registry,
        store.clone(),
        live.clone(),
        bus.clone(),
        Duration::from_secs(5),
    );
    Fixture {
        router,
        store,
        live,
        bus,
    }
}

fn fixture() -> Fixture {
    fixture_with_store(InMemoryStore::default())
}

// ---------------------------------------------------------------------------
// Registry listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_sensor_listing_excludes_deactivated() {
    let registry = SensorRegistry::new(
        Arc::new(StaticRegistry::extruder_fixture()),
        Duration::from_secs(30),
    );

    let active = registry.list_active_sensors(1).await.unwrap();
    let names: Vec<&str> = active.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["extruder_temperature"]);
}

// ---------------------------------------------------------------------------
// Scenario: in-range reading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn in_range_reading_is_stored_without_alert() {
    let f = fixture();
    let mut rx = f.bus.subscribe();

    let outcome = f
        .router
        .accept("extruder/temperature", &json!({"temperature": 171.0}))
        .await;

    assert_eq!(
        outcome,
        Outcome::Accepted {
            sensor_id: 1,
            status: Status::Normal,
        }
    );

    let readings = f.store.readings.lock().await;
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].sensor_id, 1);
    assert_eq!(readings[0].value, 171.0);
    assert!(f.store.alerts.lock().await.is_empty());

    let live = f.live.get(1).await.expect("live entry should exist");
    assert_eq!(live.status, Status::Normal);
    assert_eq!(live.reading.value, 171.0);

    assert_eq!(
        rx.recv().await.unwrap(),
        TelemetryEvent::ReadingAccepted {
            sensor_id: 1,
            status: Status::Normal,
        }
    );
}

#[tokio::test]
async fn boundary_value_is_normal() {
    let f = fixture();

    let outcome = f
        .router
        .accept("extruder/temperature", &json!({"temperature": 180.0}))
        .await;

    assert_matches!(outcome, Outcome::Accepted { status: Status::Normal, .. });
    assert!(f.store.alerts.lock().await.is_empty());
}

// ---------------------------------------------------------------------------
// Scenario: out-of-range reading raises an alert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn high_reading_stores_reading_and_alert() {
    let f = fixture();
    let mut rx = f.bus.subscribe();

    let outcome = f
        .router
        .accept("extruder/temperature", &json!({"temperature": 185.5}))
        .await;

    assert_eq!(
        outcome,
        Outcome::Accepted {
            sensor_id: 1,
            status: Status::High,
        }
    );

    assert_eq!(f.store.readings.lock().await.len(), 1);

    let alerts = f.store.alerts.lock().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].sensor_id, 1);
    assert_eq!(alerts[0].raised_by, SYSTEM_USER_ID);
    assert_eq!(
        alerts[0].description,
        "value 185.5 above allowed maximum 180 for sensor 'extruder_temperature' (extruder)"
    );

    // Alert notification precedes the reading notification.
    assert_eq!(
        rx.recv().await.unwrap(),
        TelemetryEvent::AlertRaised { sensor_id: 1 }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        TelemetryEvent::ReadingAccepted {
            sensor_id: 1,
            status: Status::High,
        }
    );
}

#[tokio::test]
async fn low_reading_alert_names_the_minimum() {
    let f = fixture();

    f.router
        .accept("extruder/temperature", &json!({"temperature": 150.0}))
        .await;

    let alerts = f.store.alerts.lock().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].description,
        "value 150 below allowed minimum 160 for sensor 'extruder_temperature' (extruder)"
    );
}

#[tokio::test]
async fn every_out_of_range_reading_raises_its_own_alert() {
    let f = fixture();

    for value in [185.0, 186.0, 187.0] {
        f.router
            .accept("extruder/temperature", &json!({"temperature": value}))
            .await;
    }

    assert_eq!(f.store.alerts.lock().await.len(), 3);
}

#[tokio::test]
async fn inactive_sensor_is_still_ingested_and_alerted() {
    let f = fixture();

    let outcome = f
        .router
        .accept("extruder/move_speed", &json!({"move_speed": 55.0}))
        .await;

    assert_eq!(
        outcome,
        Outcome::Accepted {
            sensor_id: 2,
            status: Status::High,
        }
    );
    assert_eq!(f.store.readings.lock().await.len(), 1);
    assert_eq!(f.store.alerts.lock().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario: pre-formed alerts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preformed_alert_is_recorded_verbatim() {
    let f = fixture();

    let outcome = f
        .router
        .accept(
            "extruder/alerts",
            &json!({"alert_type": "manual", "sensor_id": 1, "message": "operator stop"}),
        )
        .await;

    assert_eq!(outcome, Outcome::AlertRecorded { sensor_id: 1 });

    let alerts = f.store.alerts.lock().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].description, "operator stop");
    assert_eq!(alerts[0].raised_by, SYSTEM_USER_ID);
    assert!(f.store.readings.lock().await.is_empty());
}

#[tokio::test]
async fn preformed_alert_for_unknown_sensor_is_dropped() {
    let f = fixture();

    let outcome = f
        .router
        .accept(
            "extruder/alerts",
            &json!({"alert_type": "manual", "sensor_id": 999}),
        )
        .await;

    assert_eq!(outcome, Outcome::Dropped);
    assert!(f.store.alerts.lock().await.is_empty());
}

// ---------------------------------------------------------------------------
// Scenario: malformed and unknown frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unparseable_payload_is_dropped_without_side_effects() {
    let f = fixture();

    let outcome = f.router.accept("plant/unknown", &json!({"noise": true})).await;

    assert_eq!(outcome, Outcome::Dropped);
    assert!(f.store.readings.lock().await.is_empty());
    assert!(f.store.alerts.lock().await.is_empty());
    assert!(f.live.snapshot().await.is_empty());
}

#[tokio::test]
async fn unknown_sensor_id_is_dropped() {
    let f = fixture();

    let outcome = f
        .router
        .accept("extruder/temperature", &json!({"sensor_id": 999, "value": 5.0}))
        .await;

    assert_eq!(outcome, Outcome::Dropped);
    assert!(f.store.readings.lock().await.is_empty());
}

#[tokio::test]
async fn bad_frame_does_not_poison_subsequent_frames() {
    let f = fixture();

    f.router.accept("plant/unknown", &json!({"noise": 1})).await;
    let outcome = f
        .router
        .accept("extruder/temperature", &json!({"temperature": 170.0}))
        .await;

    assert_matches!(outcome, Outcome::Accepted { sensor_id: 1, .. });
    assert_eq!(f.store.readings.lock().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario: store failures do not stall the live path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_failure_still_updates_live_state() {
    let f = fixture_with_store(InMemoryStore {
        fail_writes: true,
        ..Default::default()
    });
    let mut rx = f.bus.subscribe();

    let outcome = f
        .router
        .accept("extruder/temperature", &json!({"temperature": 171.0}))
        .await;

    assert_eq!(
        outcome,
        Outcome::Accepted {
            sensor_id: 1,
            status: Status::Normal,
        }
    );

    let live = f.live.get(1).await.expect("live entry should exist");
    assert_eq!(live.reading.value, 171.0);
    assert_eq!(
        rx.recv().await.unwrap(),
        TelemetryEvent::ReadingAccepted {
            sensor_id: 1,
            status: Status::Normal,
        }
    );
}

// ---------------------------------------------------------------------------
// Scenario: out-of-order timestamps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_timestamp_is_stored_but_not_surfaced_live() {
    let f = fixture();

    let newer = Utc::now();
    f.router
        .accept(
            "extruder/temperature",
            &json!({"temperature": 175.0, "timestamp": newer.to_rfc3339()}),
        )
        .await;
    f.router
        .accept(
            "extruder/temperature",
            &json!({"temperature": 162.0, "timestamp": "2020-01-01T00:00:00Z"}),
        )
        .await;

    // Both readings persisted.
    assert_eq!(f.store.readings.lock().await.len(), 2);
    // Live state keeps the newer value.
    assert_eq!(f.live.get(1).await.unwrap().reading.value, 175.0);
}
