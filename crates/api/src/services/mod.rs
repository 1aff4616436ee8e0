//! Application services: session management and alert delivery.

pub mod alert_dispatch;
pub mod bus_bridge;
pub mod session_manager;

pub use alert_dispatch::{AlertDispatcher, AlertWorker, RetryPolicy};
pub use bus_bridge::HttpBridgePublisher;
pub use session_manager::{FixOutcome, SessionManager};
