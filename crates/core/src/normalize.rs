//! Inbound payload normalization.
//!
//! Transport messages arrive in heterogeneous shapes. [`classify`] maps a
//! raw JSON payload plus its transport topic to a canonical inbound form,
//! or fails closed with a typed [`NormalizeError`] — a message that cannot
//! be resolved is dropped by the router, never guessed at.
//!
//! Sensor identity resolution order:
//! 1. explicit numeric `sensor_id` / `id` field in the payload;
//! 2. the topic's second path segment, via the fixed segment table in
//!    [`crate::topics`].
//!
//! Value extraction scans a fixed priority-ordered field list and takes
//! the first numeric field present. A payload with a resolved sensor but
//! no value field fails — this never produces a silent zero reading.

use chrono::DateTime;
use serde_json::Value;

use crate::topics::{sensor_name_for_segment, ALERT_TOPIC_SUFFIX};
use crate::types::{DbId, Timestamp};

/// Value field candidates, in priority order.
const VALUE_FIELDS: &[&str] = &[
    "value",
    "temperature",
    "move_speed",
    "isolation_thickness",
    "cable_core_profile",
];

/// Sensor identity as carried by an inbound message.
///
/// A `Name` reference still needs a registry lookup; an `Id` reference
/// needs an existence check before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorRef {
    Id(DbId),
    Name(&'static str),
}

/// A normalized inbound message, ready for the ingestion router.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// A sensor reading candidate.
    Reading {
        sensor: SensorRef,
        value: f64,
        /// Timestamp from the payload, if it carried one. The router
        /// substitutes the ingestion time when absent.
        recorded_at: Option<Timestamp>,
    },
    /// A pre-formed alert published by an external system. Bypasses
    /// threshold evaluation entirely.
    Alert { sensor_id: DbId, description: String },
}

/// Why a payload could not be normalized. All variants are terminal:
/// the message is dropped and logged, never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("payload is not a structured object")]
    NotAnObject,

    #[error("no sensor identity in payload and no sensor mapping for topic '{0}'")]
    UnresolvedIdentity(String),

    #[error("sensor resolved but payload carries no value field")]
    MissingValue,

    #[error("alert payload carries no sensor_id")]
    AlertMissingSensor,
}

/// Default description for pre-formed alerts without a `message` field.
const NO_DESCRIPTION: &str = "no description";

/// Normalize a raw transport payload into an [`InboundMessage`].
pub fn classify(topic: &str, payload: &Value) -> Result<InboundMessage, NormalizeError> {
    let object = payload.as_object().ok_or(NormalizeError::NotAnObject)?;

    // Pre-formed alerts: `alert_type` key on an `*/alerts` topic.
    if topic.ends_with(ALERT_TOPIC_SUFFIX) && object.contains_key("alert_type") {
        let sensor_id = numeric_id(object.get("sensor_id"))
            .ok_or(NormalizeError::AlertMissingSensor)?;
        let description = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(NO_DESCRIPTION)
            .to_string();
        return Ok(InboundMessage::Alert {
            sensor_id,
            description,
        });
    }

    let sensor = resolve_identity(topic, object)
        .ok_or_else(|| NormalizeError::UnresolvedIdentity(topic.to_string()))?;

    let value = VALUE_FIELDS
        .iter()
        .find_map(|field| object.get(*field).and_then(Value::as_f64))
        .ok_or(NormalizeError::MissingValue)?;

    let recorded_at = object
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.to_utc());

    Ok(InboundMessage::Reading {
        sensor,
        value,
        recorded_at,
    })
}

/// Resolve the sensor reference from explicit id fields or the topic's
/// second path segment.
fn resolve_identity(topic: &str, object: &serde_json::Map<String, Value>) -> Option<SensorRef> {
    if let Some(id) = numeric_id(object.get("sensor_id")).or_else(|| numeric_id(object.get("id")))
    {
        return Some(SensorRef::Id(id));
    }

    let segment = topic.split('/').nth(1)?;
    sensor_name_for_segment(segment).map(SensorRef::Name)
}

fn numeric_id(value: Option<&Value>) -> Option<DbId> {
    value.and_then(Value::as_i64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
