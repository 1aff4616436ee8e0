//! Signal entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the signals table.
#[derive(Debug, Clone, FromRow)]
pub struct SignalEntity {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub topic: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

impl From<SignalEntity> for domain::models::Signal {
    fn from(entity: SignalEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            latitude: entity.latitude,
            longitude: entity.longitude,
            topic: entity.topic,
            city: entity.city,
        }
    }
}
