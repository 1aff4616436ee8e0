//! Nearest-signal read model sent back to clients after every fix.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Signal;

/// Maximum number of entries in a nearest-signals snapshot.
pub const NEAREST_SIGNALS_LIMIT: usize = 10;

/// A signal paired with its distance from a position.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestSignal {
    pub signal: Signal,
    pub distance_km: f64,
}

/// One row of the nearest-signals snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestSignalEntry {
    pub signal_name: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
}

impl From<&NearestSignal> for NearestSignalEntry {
    fn from(n: &NearestSignal) -> Self {
        Self {
            signal_name: n.signal.name.clone(),
            lat: n.signal.latitude,
            lon: n.signal.longitude,
            distance_km: n.distance_km,
        }
    }
}

/// Signals ranked ascending by distance, at most [`NEAREST_SIGNALS_LIMIT`] long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestSignalsSnapshot {
    pub top10: Vec<NearestSignalEntry>,
}

impl NearestSignalsSnapshot {
    pub fn from_ranked(ranked: &[NearestSignal]) -> Self {
        Self {
            top10: ranked
                .iter()
                .take(NEAREST_SIGNALS_LIMIT)
                .map(NearestSignalEntry::from)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.top10.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top10.is_empty()
    }
}

/// Query parameters for the nearest-signals endpoint.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NearestSignalsQuery {
    #[validate(custom(function = "shared::validation::validate_city"))]
    pub city: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(range(min = 1, max = 10, message = "Limit must be between 1 and 10"))]
    pub limit: Option<usize>,
}
