//! Alert publisher abstraction for the outbound bus.
//!
//! The tracking core only depends on [`AlertPublisher`]; concrete transports
//! live in the API crate.

use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Errors that can occur while publishing an alert.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    /// Delivery failed but may succeed on retry.
    #[error("Transient publish failure: {0}")]
    Transient(String),

    /// Delivery was refused; retrying will not help.
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

impl PublishError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }
}

/// Publish contract to the external bus. Shared by all sessions.
#[async_trait::async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

/// Publisher that only logs alerts.
#[derive(Debug, Clone, Default)]
pub struct LoggingAlertPublisher;

#[async_trait::async_trait]
impl AlertPublisher for LoggingAlertPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        tracing::info!(
            topic = %topic,
            payload = %String::from_utf8_lossy(payload),
            "Alert published (log only)"
        );
        Ok(())
    }
}

/// A publish recorded by [`MockAlertPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

/// Mock publisher for testing.
///
/// Records every publish attempt. It can fail the first N attempts with a
/// transient error, or fail all of them.
#[derive(Debug, Clone, Default)]
pub struct MockAlertPublisher {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    attempts: Arc<Mutex<usize>>,
    fail_first: usize,
    always_fail: bool,
}

impl MockAlertPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every attempt fails.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// A publisher that fails the first `n` attempts, then succeeds.
    pub fn flaky(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::default()
        }
    }

    /// Successfully published messages, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Total attempts, including failures.
    pub fn attempts(&self) -> usize {
        self.attempts.lock().map(|a| *a).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AlertPublisher for MockAlertPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let attempt = {
            let mut attempts = self
                .attempts
                .lock()
                .map_err(|_| PublishError::Rejected("mock poisoned".to_string()))?;
            *attempts += 1;
            *attempts
        };

        if self.always_fail || attempt <= self.fail_first {
            tracing::warn!(topic = %topic, attempt, "Mock publisher simulating failure");
            return Err(PublishError::Transient("Simulated failure".to_string()));
        }

        if let Ok(mut published) = self.published.lock() {
            published.push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            });
        }
        Ok(())
    }
}
