//! Sensor and feed topic tables.
//!
//! Inbound transport topics look like `extruder/temperature`; the
//! second path segment identifies the sensor type. Outbound feed topics
//! name the live subscription channels served over WebSocket.

use serde::{Deserialize, Serialize};

/// Canonical sensor names for the production line.
pub const SENSOR_EXTRUDER_TEMPERATURE: &str = "extruder_temperature";
pub const SENSOR_DRAW_SPEED: &str = "draw_speed";
pub const SENSOR_INSULATION_THICKNESS: &str = "insulation_thickness";
pub const SENSOR_CABLE_CORE_PROFILE: &str = "cable_core_profile";

/// Suffix marking a transport topic that carries pre-formed alerts.
pub const ALERT_TOPIC_SUFFIX: &str = "/alerts";

/// Transport topics subscribed to by default.
pub const DEFAULT_TRANSPORT_TOPICS: &[&str] = &[
    "extruder/temperature",
    "extruder/move_speed",
    "extruder/isolation_thickness",
    "extruder/cable_core_profile",
    "extruder/alerts",
];

/// Map a transport topic's second segment to a canonical sensor name.
///
/// Returns `None` for unrecognized segments; the message is then only
/// processable if the payload carries an explicit sensor id.
pub fn sensor_name_for_segment(segment: &str) -> Option<&'static str> {
    match segment {
        "temperature" => Some(SENSOR_EXTRUDER_TEMPERATURE),
        "move_speed" => Some(SENSOR_DRAW_SPEED),
        "isolation_thickness" => Some(SENSOR_INSULATION_THICKNESS),
        "cable_core_profile" => Some(SENSOR_CABLE_CORE_PROFILE),
        _ => None,
    }
}

/// Display unit for a sensor, keyed by canonical name.
///
/// Unknown names get an empty unit rather than an error; units are a
/// presentation concern only.
pub fn unit_for_sensor(name: &str) -> &'static str {
    match name {
        SENSOR_EXTRUDER_TEMPERATURE => "°C",
        SENSOR_DRAW_SPEED => "m/min",
        SENSOR_INSULATION_THICKNESS => "mm",
        SENSOR_CABLE_CORE_PROFILE => "mm²",
        _ => "",
    }
}

// ---------------------------------------------------------------------------
// Feed topics
// ---------------------------------------------------------------------------

/// A live subscription channel served to WebSocket consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedTopic {
    Dashboard,
    Sensors,
    Alerts,
}

impl FeedTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedTopic::Dashboard => "dashboard",
            FeedTopic::Sensors => "sensors",
            FeedTopic::Alerts => "alerts",
        }
    }

    /// Parse a feed topic from its path segment.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dashboard" => Some(FeedTopic::Dashboard),
            "sensors" => Some(FeedTopic::Sensors),
            "alerts" => Some(FeedTopic::Alerts),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_segments_resolve() {
        assert_eq!(
            sensor_name_for_segment("temperature"),
            Some(SENSOR_EXTRUDER_TEMPERATURE)
        );
        assert_eq!(sensor_name_for_segment("move_speed"), Some(SENSOR_DRAW_SPEED));
        assert_eq!(sensor_name_for_segment("bogus"), None);
    }

    #[test]
    fn units_for_unknown_sensors_are_empty() {
        assert_eq!(unit_for_sensor(SENSOR_DRAW_SPEED), "m/min");
        assert_eq!(unit_for_sensor("made_up"), "");
    }

    #[test]
    fn feed_topic_round_trips_through_parse() {
        for topic in [FeedTopic::Dashboard, FeedTopic::Sensors, FeedTopic::Alerts] {
            assert_eq!(FeedTopic::parse(topic.as_str()), Some(topic));
        }
        assert_eq!(FeedTopic::parse("reports"), None);
    }
}
