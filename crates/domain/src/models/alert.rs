//! Preemption alert domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default topic prefix for alerts on the bus.
pub const DEFAULT_TOPIC_PREFIX: &str = "traffic";

/// Compass quartile reported with an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compass {
    North,
    East,
    South,
    West,
}

impl Compass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compass::North => "NORTH",
            Compass::East => "EAST",
            Compass::South => "SOUTH",
            Compass::West => "WEST",
        }
    }
}

impl std::fmt::Display for Compass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State label carried by an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Approaching,
    Leaving,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Approaching => "approaching",
            AlertState::Leaving => "leaving",
        }
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert instructing a signal controller to react to an emergency vehicle.
///
/// Serializes to the bus payload. The emission time stays local and is only
/// used for logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub signal_topic: String,
    /// Distance in kilometers, rounded to 3 decimals.
    #[serde(rename = "distKM")]
    pub dist_km: f64,
    pub direction: Compass,
    pub state: AlertState,
    #[serde(skip)]
    pub emitted_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(
        state: AlertState,
        signal_topic: impl Into<String>,
        dist_km: f64,
        direction: Compass,
    ) -> Self {
        Self {
            signal_topic: signal_topic.into(),
            dist_km: crate::services::geodesy::round3(dist_km),
            direction,
            state,
            emitted_at: Utc::now(),
        }
    }

    /// Bus topic for this alert, `{prefix}/{signal_topic}`.
    pub fn topic(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.signal_topic)
    }

    /// JSON payload published on the bus.
    pub fn payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
