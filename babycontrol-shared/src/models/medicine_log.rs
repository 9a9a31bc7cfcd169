/// Doses given from the family's medicine catalogue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{ActivityKind, ActivityLog};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MedicineLog {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub medicine_id: Uuid,
    pub time: DateTime<Utc>,
    pub dose_amount: f64,
    pub unit_abbr: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for MedicineLog {
    const KIND: ActivityKind = ActivityKind::Medicine;
    const TABLE: &'static str = "medicine_logs";
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
pub struct MedicineLogInput {
    pub baby_id: Uuid,
    pub medicine_id: Uuid,
    pub time: DateTime<Utc>,
    pub dose_amount: f64,
    pub unit_abbr: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MedicineLogPatch {
    pub medicine_id: Option<Uuid>,
    pub time: Option<DateTime<Utc>>,
    pub dose_amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub notes: Option<String>,
}

impl MedicineLogPatch {
    pub fn apply(self, current: &MedicineLog) -> MedicineLogInput {
        MedicineLogInput {
            baby_id: current.baby_id,
            medicine_id: self.medicine_id.unwrap_or(current.medicine_id),
            time: self.time.unwrap_or(current.time),
            dose_amount: self.dose_amount.unwrap_or(current.dose_amount),
            unit_abbr: self.unit_abbr.or_else(|| current.unit_abbr.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
        }
    }
}

impl MedicineLog {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: MedicineLogInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MedicineLog>(
            r#"
            INSERT INTO medicine_logs (family_id, baby_id, caretaker_id, medicine_id, time,
                                       dose_amount, unit_abbr, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.medicine_id)
        .bind(input.time)
        .bind(input.dose_amount)
        .bind(input.unit_abbr)
        .bind(input.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: MedicineLogInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MedicineLog>(
            r#"
            UPDATE medicine_logs
            SET medicine_id = $3, time = $4, dose_amount = $5, unit_abbr = $6, notes = $7,
                updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.medicine_id)
        .bind(input.time)
        .bind(input.dose_amount)
        .bind(input.unit_abbr)
        .bind(input.notes)
        .fetch_optional(pool)
        .await
    }
}
