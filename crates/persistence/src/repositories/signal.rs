//! Signal repository implementation.
//!
//! Read-only: signals are administered elsewhere.

use domain::models::Signal;
use domain::services::{DirectoryError, SignalDirectory};
use sqlx::PgPool;

use crate::entities::SignalEntity;
use crate::metrics::{record_signal_lookup, QueryTimer};

/// Repository for signal database reads.
#[derive(Clone)]
pub struct SignalRepository {
    pool: PgPool,
}

impl SignalRepository {
    /// Creates a new signal repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds all signals of a city, ignoring case.
    ///
    /// Rows come back in id order so nearest-signal ties resolve the same way
    /// on every load.
    pub async fn find_by_city(&self, city: &str) -> Result<Vec<SignalEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_signals_by_city");
        let result = sqlx::query_as::<_, SignalEntity>(
            r#"
            SELECT id, name, latitude, longitude, topic, city, created_at
            FROM signals
            WHERE LOWER(city) = LOWER($1)
            ORDER BY id
            "#,
        )
        .bind(city.trim())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        if let Ok(rows) = &result {
            record_signal_lookup(rows.len());
        }
        result
    }
}

#[async_trait::async_trait]
impl SignalDirectory for SignalRepository {
    async fn lookup_by_city(&self, city: &str) -> Result<Vec<Signal>, DirectoryError> {
        let rows = self
            .find_by_city(city)
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(rows.into_iter().map(Signal::from).collect())
    }
}
