//! Traffic signal domain model.

use geo::Point;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A traffic signal that can receive preemption alerts.
///
/// Signals are owned by an external store and are read-only here. A tracking
/// session keeps the snapshot it loaded and never refreshes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Key of the controller that should receive alerts for this signal.
    pub topic: String,
    pub city: String,
}

impl Signal {
    /// Position of the signal (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Query parameters for listing the signals of a city.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListSignalsQuery {
    #[validate(custom(function = "shared::validation::validate_city"))]
    pub city: String,
}

/// Response for listing signals.
#[derive(Debug, Clone, Serialize)]
pub struct ListSignalsResponse {
    pub city: String,
    pub signals: Vec<Signal>,
    pub total: usize,
}

impl ListSignalsResponse {
    pub fn new(city: impl Into<String>, signals: Vec<Signal>) -> Self {
        Self {
            city: city.into(),
            total: signals.len(),
            signals,
        }
    }
}
