//! Persistence layer for the signal preemption backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations (signal read path)
//! - Query metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
