//! Signal directory: read-only lookup of the signals in a city.

use std::collections::HashMap;

use thiserror::Error;

use crate::models::Signal;

/// Errors raised by a signal directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Signal store unavailable: {0}")]
    Unavailable(String),
}

/// Read path to the signal store.
#[async_trait::async_trait]
pub trait SignalDirectory: Send + Sync {
    /// Returns all signals of `city`. An unknown city yields an empty list.
    async fn lookup_by_city(&self, city: &str) -> Result<Vec<Signal>, DirectoryError>;
}

/// In-memory directory for development and testing.
///
/// City matching ignores ASCII case, like the database read path.
#[derive(Debug, Clone, Default)]
pub struct InMemorySignalDirectory {
    by_city: HashMap<String, Vec<Signal>>,
}

impl InMemorySignalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from a flat list, grouping signals by city and
    /// keeping their relative order.
    pub fn from_signals(signals: impl IntoIterator<Item = Signal>) -> Self {
        let mut directory = Self::new();
        for signal in signals {
            directory.insert(signal);
        }
        directory
    }

    pub fn insert(&mut self, signal: Signal) {
        self.by_city
            .entry(signal.city.trim().to_ascii_lowercase())
            .or_default()
            .push(signal);
    }
}

#[async_trait::async_trait]
impl SignalDirectory for InMemorySignalDirectory {
    async fn lookup_by_city(&self, city: &str) -> Result<Vec<Signal>, DirectoryError> {
        Ok(self
            .by_city
            .get(&city.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}
