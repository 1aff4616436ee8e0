//! Domain layer for the signal preemption backend.
//!
//! This crate contains:
//! - Domain models (Signal, LocationFix, AlertEvent, nearest-signal snapshot)
//! - Geodesy, proximity classification and the per-session tracking state machine
//! - Collaborator contracts (signal directory, alert publisher)

pub mod models;
pub mod services;
