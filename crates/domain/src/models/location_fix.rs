//! Location fix domain model.

use chrono::{DateTime, TimeZone, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One position sample pushed by a vehicle over its live connection.
///
/// Field names follow the client wire format (`x`, `y`, `acc`).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationFix {
    /// Latitude in degrees.
    #[serde(rename = "x")]
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    /// Longitude in degrees.
    #[serde(rename = "y")]
    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(custom(function = "shared::validation::validate_city"))]
    pub city: String,

    /// Client send time in epoch seconds. Only used for latency logging.
    #[validate(custom(function = "shared::validation::validate_sent_time"))]
    pub sent_time: f64,

    /// Reported accuracy in meters (informational).
    #[serde(rename = "acc", default)]
    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: f64,

    /// Heading hint from the client. Accepted but not used by tracking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl LocationFix {
    /// Position of the fix (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// City label with surrounding whitespace removed.
    pub fn city(&self) -> &str {
        self.city.trim()
    }

    /// Client send time as a UTC timestamp.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt((self.sent_time * 1000.0) as i64)
            .single()
    }

    /// Milliseconds between the client send time and `now`.
    ///
    /// Negative values mean the client clock runs ahead of the server.
    pub fn latency_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.sent_at()
            .map(|sent| (now - sent).num_milliseconds())
    }
}
