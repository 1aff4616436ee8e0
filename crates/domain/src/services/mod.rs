//! Domain services for signal preemption.
//!
//! Services contain business logic that operates on domain models.

pub mod directory;
pub mod geodesy;
pub mod proximity;
pub mod publisher;
pub mod tracking;

pub use directory::{DirectoryError, InMemorySignalDirectory, SignalDirectory};
pub use publisher::{
    AlertPublisher, LoggingAlertPublisher, MockAlertPublisher, PublishError, PublishedMessage,
};
pub use tracking::{
    Evaluation, Observation, SessionState, TrackedSession, TrackingConfig, TrackingError, Trend,
};
