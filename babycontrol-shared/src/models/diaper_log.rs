/// Diaper logs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{ActivityKind, ActivityLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaperType {
    Wet,
    Dirty,
    Both,
}

impl DiaperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiaperType::Wet => "wet",
            DiaperType::Dirty => "dirty",
            DiaperType::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "wet" => Some(DiaperType::Wet),
            "dirty" => Some(DiaperType::Dirty),
            "both" => Some(DiaperType::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiaperLog {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub time: DateTime<Utc>,
    pub diaper_type: String,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub blowout: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for DiaperLog {
    const KIND: ActivityKind = ActivityKind::Diaper;
    const TABLE: &'static str = "diaper_logs";
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
pub struct DiaperLogInput {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,
    pub diaper_type: DiaperType,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub blowout: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DiaperLogPatch {
    pub time: Option<DateTime<Utc>>,
    pub diaper_type: Option<DiaperType>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub blowout: Option<bool>,
}

impl DiaperLogPatch {
    pub fn apply(self, current: &DiaperLog) -> DiaperLogInput {
        DiaperLogInput {
            baby_id: current.baby_id,
            time: self.time.unwrap_or(current.time),
            diaper_type: self
                .diaper_type
                .or_else(|| DiaperType::from_str(&current.diaper_type))
                .unwrap_or(DiaperType::Wet),
            condition: self.condition.or_else(|| current.condition.clone()),
            color: self.color.or_else(|| current.color.clone()),
            blowout: self.blowout.unwrap_or(current.blowout),
        }
    }
}

impl DiaperLog {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: DiaperLogInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DiaperLog>(
            r#"
            INSERT INTO diaper_logs (family_id, baby_id, caretaker_id, time, diaper_type,
                                     condition, color, blowout)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.time)
        .bind(input.diaper_type.as_str())
        .bind(input.condition)
        .bind(input.color)
        .bind(input.blowout)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: DiaperLogInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DiaperLog>(
            r#"
            UPDATE diaper_logs
            SET time = $3, diaper_type = $4, condition = $5, color = $6, blowout = $7,
                updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.time)
        .bind(input.diaper_type.as_str())
        .bind(input.condition)
        .bind(input.color)
        .bind(input.blowout)
        .fetch_optional(pool)
        .await
    }
}
