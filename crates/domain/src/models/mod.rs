//! Domain models for signal preemption.

pub mod alert;
pub mod location_fix;
pub mod nearest;
pub mod signal;

pub use alert::{AlertEvent, AlertState, Compass, DEFAULT_TOPIC_PREFIX};
pub use location_fix::LocationFix;
pub use nearest::{
    NearestSignal, NearestSignalEntry, NearestSignalsQuery, NearestSignalsSnapshot,
    NEAREST_SIGNALS_LIMIT,
};
pub use signal::{ListSignalsQuery, ListSignalsResponse, Signal};
