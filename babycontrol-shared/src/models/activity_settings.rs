/// Stored activity button order and visibility
///
/// A row with `caretaker_id = NULL` is the family default; at most one row
/// exists per caretaker and one default per family (partial unique indexes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivitySettings {
    pub id: Uuid,
    pub family_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub activity_order: Vec<String>,
    pub visible: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActivitySettings {
    /// Finds the caretaker's row, or the family default when `caretaker_id` is `None`
    pub async fn find(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivitySettings>(
            "SELECT * FROM activity_settings \
             WHERE family_id = $1 AND caretaker_id IS NOT DISTINCT FROM $2",
        )
        .bind(family_id)
        .bind(caretaker_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        activity_order: &[String],
        visible: &[String],
    ) -> Result<Self, sqlx::Error> {
        // ON CONFLICT has to name the matching partial index predicate
        let conflict = match caretaker_id {
            Some(_) => "(family_id, caretaker_id) WHERE caretaker_id IS NOT NULL",
            None => "(family_id) WHERE caretaker_id IS NULL",
        };

        sqlx::query_as::<_, ActivitySettings>(&format!(
            "INSERT INTO activity_settings (family_id, caretaker_id, activity_order, visible) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT {} DO UPDATE \
             SET activity_order = EXCLUDED.activity_order, visible = EXCLUDED.visible, \
                 updated_at = NOW() \
             RETURNING *",
            conflict
        ))
        .bind(family_id)
        .bind(caretaker_id)
        .bind(activity_order)
        .bind(visible)
        .fetch_one(pool)
        .await
    }
}
