/// Sleep logs
///
/// A sleep log without an end time means the baby is asleep right now.
/// `duration_minutes` is derived from the start and end times on every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{duration_minutes, ActivityKind, ActivityLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepType {
    Nap,
    NightSleep,
}

impl SleepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepType::Nap => "nap",
            SleepType::NightSleep => "night_sleep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "nap" => Some(SleepType::Nap),
            "night_sleep" => Some(SleepType::NightSleep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SleepLog {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub sleep_type: String,
    pub location: Option<String>,
    pub quality: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for SleepLog {
    const KIND: ActivityKind = ActivityKind::Sleep;
    const TABLE: &'static str = "sleep_logs";
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

/// Full set of writable values
#[derive(Debug, Clone)]
pub struct SleepLogInput {
    pub baby_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub sleep_type: SleepType,
    pub location: Option<String>,
    pub quality: Option<String>,
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct SleepLogPatch {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub sleep_type: Option<SleepType>,
    pub location: Option<String>,
    pub quality: Option<String>,
}

impl SleepLogPatch {
    pub fn apply(self, current: &SleepLog) -> SleepLogInput {
        SleepLogInput {
            baby_id: current.baby_id,
            start_time: self.start_time.unwrap_or(current.start_time),
            end_time: self.end_time.or(current.end_time),
            sleep_type: self
                .sleep_type
                .or_else(|| SleepType::from_str(&current.sleep_type))
                .unwrap_or(SleepType::Nap),
            location: self.location.or_else(|| current.location.clone()),
            quality: self.quality.or_else(|| current.quality.clone()),
        }
    }
}

impl SleepLog {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: SleepLogInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SleepLog>(
            r#"
            INSERT INTO sleep_logs (family_id, baby_id, caretaker_id, start_time, end_time,
                                    duration_minutes, sleep_type, location, quality)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(duration_minutes(input.start_time, input.end_time))
        .bind(input.sleep_type.as_str())
        .bind(input.location)
        .bind(input.quality)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: SleepLogInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SleepLog>(
            r#"
            UPDATE sleep_logs
            SET start_time = $3, end_time = $4, duration_minutes = $5, sleep_type = $6,
                location = $7, quality = $8, updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(duration_minutes(input.start_time, input.end_time))
        .bind(input.sleep_type.as_str())
        .bind(input.location)
        .bind(input.quality)
        .fetch_optional(pool)
        .await
    }

    /// The open (still sleeping) log for a baby, if any
    pub async fn find_open(
        pool: &PgPool,
        family_id: Uuid,
        baby_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SleepLog>(
            r#"
            SELECT * FROM sleep_logs
            WHERE family_id = $1 AND baby_id = $2 AND end_time IS NULL AND deleted_at IS NULL
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(family_id)
        .bind(baby_id)
        .fetch_optional(pool)
        .await
    }
}
