/// Bath logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{ActivityKind, ActivityLog};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BathLog {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub time: DateTime<Utc>,
    pub soap_used: bool,
    pub shampoo_used: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for BathLog {
    const KIND: ActivityKind = ActivityKind::Bath;
    const TABLE: &'static str = "bath_logs";
    const TIME_COLUMN: &'static str = "time";

    fn id(&self) -> Uuid {
        self.id
    }

    fn baby_id(&self) -> Uuid {
        self.baby_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.time
    }
}

#[derive(Debug, Clone)]
pub struct BathLogInput {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,
    pub soap_used: bool,
    pub shampoo_used: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BathLogPatch {
    pub time: Option<DateTime<Utc>>,
    pub soap_used: Option<bool>,
    pub shampoo_used: Option<bool>,
    pub notes: Option<String>,
}

impl BathLogPatch {
    pub fn apply(self, current: &BathLog) -> BathLogInput {
        BathLogInput {
            baby_id: current.baby_id,
            time: self.time.unwrap_or(current.time),
            soap_used: self.soap_used.unwrap_or(current.soap_used),
            shampoo_used: self.shampoo_used.unwrap_or(current.shampoo_used),
            notes: self.notes.or_else(|| current.notes.clone()),
        }
    }
}

impl BathLog {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: BathLogInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BathLog>(
            r#"
            INSERT INTO bath_logs
                (family_id, baby_id, caretaker_id, time, soap_used, shampoo_used, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.time)
        .bind(input.soap_used)
        .bind(input.shampoo_used)
        .bind(input.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: BathLogInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BathLog>(
            r#"
            UPDATE bath_logs
            SET time = $3, soap_used = $4, shampoo_used = $5, notes = $6, updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.time)
        .bind(input.soap_used)
        .bind(input.shampoo_used)
        .bind(input.notes)
        .fetch_optional(pool)
        .await
    }
}
