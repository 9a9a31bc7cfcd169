/// Processed Stripe webhook events, kept for idempotency

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StripeEvent {
    pub event_id: String,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
}

impl StripeEvent {
    pub async fn exists(pool: &PgPool, event_id: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM stripe_events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Records an event; a replayed id is ignored
    pub async fn record(
        pool: &PgPool,
        event_id: &str,
        event_type: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO stripe_events (event_id, event_type) VALUES ($1, $2) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(pool)
        .await?;

        Ok(())
    }
}
