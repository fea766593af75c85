//! Per-topic snapshot broadcaster tasks.
//!
//! Each feed topic gets at most one background task. The task wakes on
//! a fixed interval (and, for the alert feed, on bus notifications),
//! builds a JSON snapshot, and pushes it through the [`FeedManager`].
//! Tasks start lazily with the first subscriber and stop when the last
//! one leaves.
//!
//! A snapshot build that hits a database failure degrades to an error
//! frame instead of killing the task; the feed recovers on the next
//! tick.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::ws::Message;
use chrono::Utc;
use linewatch_core::stats::round2;
use linewatch_core::topics::{unit_for_sensor, FeedTopic};
use linewatch_db::repositories::{AlertRepo, SensorRepo};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;
use crate::ws::manager::FeedManager;

/// Alerts shown in the dashboard snapshot.
const DASHBOARD_ALERT_LIMIT: i64 = 5;

/// Alerts shown in the alert feed snapshot.
const ALERT_FEED_LIMIT: i64 = 100;

struct Broadcaster {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of running snapshot broadcasters, one slot per feed topic.
#[derive(Default)]
pub struct SnapshotBroadcasters {
    tasks: Mutex<HashMap<FeedTopic, Broadcaster>>,
}

impl SnapshotBroadcasters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the broadcaster for a topic if it is not already running.
    pub async fn ensure_running(&self, topic: FeedTopic, state: &AppState) {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&topic) {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_broadcaster(topic, state.clone(), cancel.clone()));
        tasks.insert(topic, Broadcaster { cancel, handle });
        tracing::info!(topic = %topic, "Snapshot broadcaster started");
    }

    /// Stop a topic's broadcaster when it has no subscribers left.
    pub async fn stop_if_empty(&self, topic: FeedTopic, feeds: &FeedManager) {
        if feeds.subscriber_count(topic).await > 0 {
            return;
        }
        let mut tasks = self.tasks.lock().await;
        if let Some(broadcaster) = tasks.remove(&topic) {
            broadcaster.cancel.cancel();
            broadcaster.handle.abort();
            tracing::info!(topic = %topic, "Snapshot broadcaster stopped");
        }
    }

    /// Cancel every broadcaster. Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut tasks = self.tasks.lock().await;
        for (topic, broadcaster) in tasks.drain() {
            broadcaster.cancel.cancel();
            broadcaster.handle.abort();
            tracing::debug!(topic = %topic, "Snapshot broadcaster cancelled");
        }
    }
}

/// Broadcast loop for one feed topic.
async fn run_broadcaster(topic: FeedTopic, state: AppState, cancel: CancellationToken) {
    let period = match topic {
        FeedTopic::Dashboard | FeedTopic::Sensors => {
            Duration::from_secs(state.config.snapshot_interval_secs)
        }
        FeedTopic::Alerts => Duration::from_secs(state.config.alert_snapshot_interval_secs),
    };
    let mut interval = tokio::time::interval(period);
    let mut bus_rx = state.bus.subscribe();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                broadcast_snapshot(topic, &state).await;
            }
            event = bus_rx.recv() => {
                match event {
                    // The alert feed reacts immediately instead of
                    // waiting out its longer interval.
                    Ok(linewatch_ingest::bus::TelemetryEvent::AlertRaised { .. })
                        if topic == FeedTopic::Alerts =>
                    {
                        broadcast_snapshot(topic, &state).await;
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(topic = %topic, skipped, "Feed broadcaster lagged on bus");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        // Keep ticking; the bus only closes at shutdown
                        // and the cancel token ends the loop then.
                        bus_rx = state.bus.subscribe();
                    }
                }
            }
        }
    }
}

/// Build and push one snapshot frame for a topic.
async fn broadcast_snapshot(topic: FeedTopic, state: &AppState) {
    let data = match topic {
        FeedTopic::Dashboard => build_dashboard_snapshot(state).await,
        FeedTopic::Sensors => build_sensors_snapshot(state).await,
        FeedTopic::Alerts => build_alerts_snapshot(state).await,
    };

    let frame = json!({
        "topic": topic.as_str(),
        "data": data,
    });
    let text = match serde_json::to_string(&frame) {
        Ok(text) => text,
        Err(error) => {
            tracing::error!(topic = %topic, %error, "Failed to serialize snapshot");
            return;
        }
    };

    state.feeds.broadcast_to(topic, Message::Text(text.into())).await;
}

/// Derive the overall line status from recent alert volume.
///
/// More than 5 alerts in the last day is critical, more than 2 is a
/// warning; otherwise the line is normal as long as at least one sensor
/// is active.
pub fn derive_status(alerts_last_day: i64, active_sensors: i64) -> &'static str {
    if alerts_last_day > 5 {
        "critical"
    } else if alerts_last_day > 2 {
        "warning"
    } else if active_sensors >= 1 {
        "normal"
    } else {
        "unknown"
    }
}

/// Dashboard snapshot: line status, live sensor values, recent alerts.
async fn build_dashboard_snapshot(state: &AppState) -> Value {
    let since = Utc::now() - chrono::Duration::hours(24);

    let counts = tokio::try_join!(
        AlertRepo::count_since(&state.pool, since),
        SensorRepo::count_active(&state.pool),
        AlertRepo::recent(&state.pool, DASHBOARD_ALERT_LIMIT),
    );

    let (alerts_last_day, active_sensors, recent_alerts) = match counts {
        Ok(values) => values,
        Err(error) => {
            tracing::error!(%error, "Dashboard snapshot query failed");
            return degraded_snapshot();
        }
    };

    // The dashboard only shows active sensors; deactivation hides a
    // sensor here without silencing its ingestion.
    let sensors = live_sensor_values(state, true).await;
    let alerts: Vec<Value> = recent_alerts.iter().map(alert_json).collect();

    json!({
        "status": derive_status(alerts_last_day, active_sensors),
        "active_sensors": active_sensors,
        "alerts_last_day": alerts_last_day,
        "sensors": sensors,
        "alerts": alerts,
    })
}

/// Sensors snapshot: the live value, status, and bounds per sensor,
/// inactive sensors included.
async fn build_sensors_snapshot(state: &AppState) -> Value {
    json!({ "sensors": live_sensor_values(state, false).await })
}

/// Alerts snapshot: the most recent alert events.
async fn build_alerts_snapshot(state: &AppState) -> Value {
    match AlertRepo::recent(&state.pool, ALERT_FEED_LIMIT).await {
        Ok(alerts) => {
            let alerts: Vec<Value> = alerts.iter().map(alert_json).collect();
            json!({ "alerts": alerts })
        }
        Err(error) => {
            tracing::error!(%error, "Alert snapshot query failed");
            degraded_snapshot()
        }
    }
}

/// Degraded frame sent when a snapshot cannot be built. The feed stays
/// up and recovers on the next successful tick.
fn degraded_snapshot() -> Value {
    json!({
        "status": "error",
        "sensors": [],
        "alerts": [],
    })
}

/// Project the live state into presentation JSON, enriched with names
/// and units from the registry.
async fn live_sensor_values(state: &AppState, active_only: bool) -> Vec<Value> {
    let mut out = Vec::new();
    for entry in state.live.snapshot().await {
        let sensor_id = entry.reading.sensor_id;
        let sensor = match state.registry.sensor(sensor_id).await {
            Ok(sensor) => sensor,
            Err(_) => None,
        };
        if active_only && !sensor.as_ref().is_some_and(|s| s.active) {
            continue;
        }
        let name = sensor.map(|s| s.name).unwrap_or_default();
        out.push(json!({
            "sensor_id": sensor_id,
            "name": name,
            "unit": unit_for_sensor(&name),
            "value": round2(entry.reading.value),
            "status": entry.status.as_str(),
            "recorded_at": entry.reading.recorded_at,
            "min_value": entry.bounds.map(|b| b.min_value),
            "max_value": entry.bounds.map(|b| b.max_value),
        }));
    }
    out
}

fn alert_json(alert: &linewatch_db::models::AlertWithSensor) -> Value {
    json!({
        "id": alert.id,
        "sensor_id": alert.sensor_id,
        "sensor_name": alert.sensor_name,
        "description": alert.description,
        "recorded_at": alert.recorded_at,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_alerts_is_critical() {
        assert_eq!(derive_status(6, 4), "critical");
        assert_eq!(derive_status(100, 0), "critical");
    }

    #[test]
    fn some_alerts_is_warning() {
        assert_eq!(derive_status(3, 4), "warning");
        assert_eq!(derive_status(5, 4), "warning");
    }

    #[test]
    fn quiet_line_with_active_sensors_is_normal() {
        assert_eq!(derive_status(0, 1), "normal");
        assert_eq!(derive_status(2, 4), "normal");
    }

    #[test]
    fn no_active_sensors_is_unknown() {
        assert_eq!(derive_status(0, 0), "unknown");
    }
}
