//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod signal;

pub use signal::SignalEntity;
