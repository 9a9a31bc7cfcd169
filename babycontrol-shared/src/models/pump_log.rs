/// Breast pump logs
///
/// `duration_minutes` comes from the start/end times; `total_amount` defaults
/// to left + right when the caller doesn't give one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{duration_minutes, ActivityKind, ActivityLog};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PumpLog {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub left_amount: Option<f64>,
    pub right_amount: Option<f64>,
    pub total_amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for PumpLog {
    const KIND: ActivityKind = ActivityKind::Pump;
    const TABLE: &'static str = "pump_logs";
    const TIME_COLUMN: &'static str = "start_time";

    fn id(&self) -> Uuid {
        self.id
    }

    fn baby_id(&self) -> Uuid {
        self.baby_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.start_time
    }
}

#[derive(Debug, Clone)]
pub struct PumpLogInput {
    pub baby_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub left_amount: Option<f64>,
    pub right_amount: Option<f64>,
    pub total_amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub notes: Option<String>,
}

impl PumpLogInput {
    /// Explicit total, else the sum of whichever sides were recorded
    pub fn effective_total(&self) -> Option<f64> {
        self.total_amount.or(match (self.left_amount, self.right_amount) {
            (None, None) => None,
            (left, right) => Some(left.unwrap_or(0.0) + right.unwrap_or(0.0)),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PumpLogPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub left_amount: Option<f64>,
    pub right_amount: Option<f64>,
    pub total_amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub notes: Option<String>,
}

impl PumpLogPatch {
    pub fn apply(self, current: &PumpLog) -> PumpLogInput {
        let sides_changed = self.left_amount.is_some() || self.right_amount.is_some();

        PumpLogInput {
            baby_id: current.baby_id,
            start_time: self.start_time.unwrap_or(current.start_time),
            end_time: self.end_time.or(current.end_time),
            left_amount: self.left_amount.or(current.left_amount),
            right_amount: self.right_amount.or(current.right_amount),
            // Changing a side recomputes the total unless one is given
            total_amount: match self.total_amount {
                Some(total) => Some(total),
                None if sides_changed => None,
                None => current.total_amount,
            },
            unit_abbr: self.unit_abbr.or_else(|| current.unit_abbr.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
        }
    }
}

impl PumpLog {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: PumpLogInput,
    ) -> Result<Self, sqlx::Error> {
        let total = input.effective_total();

        sqlx::query_as::<_, PumpLog>(
            r#"
            INSERT INTO pump_logs (family_id, baby_id, caretaker_id, start_time, end_time,
                                   duration_minutes, left_amount, right_amount, total_amount,
                                   unit_abbr, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(duration_minutes(input.start_time, input.end_time))
        .bind(input.left_amount)
        .bind(input.right_amount)
        .bind(total)
        .bind(input.unit_abbr)
        .bind(input.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: PumpLogInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let total = input.effective_total();

        sqlx::query_as::<_, PumpLog>(
            r#"
            UPDATE pump_logs
            SET start_time = $3, end_time = $4, duration_minutes = $5, left_amount = $6,
                right_amount = $7, total_amount = $8, unit_abbr = $9, notes = $10,
                updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(duration_minutes(input.start_time, input.end_time))
        .bind(input.left_amount)
        .bind(input.right_amount)
        .bind(total)
        .bind(input.unit_abbr)
        .bind(input.notes)
        .fetch_optional(pool)
        .await
    }
}
