//! Repository implementations for database operations.

pub mod signal;

pub use signal::SignalRepository;
