//! Shared utilities and common types for the signal preemption backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Coordinate and fix field validation

pub mod validation;
