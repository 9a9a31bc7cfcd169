/// Developmental milestones

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{ActivityKind, ActivityLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneCategory {
    Motor,
    Cognitive,
    Social,
    Language,
    Custom,
}

impl MilestoneCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneCategory::Motor => "motor",
            MilestoneCategory::Cognitive => "cognitive",
            MilestoneCategory::Social => "social",
            MilestoneCategory::Language => "language",
            MilestoneCategory::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "motor" => Some(MilestoneCategory::Motor),
            "cognitive" => Some(MilestoneCategory::Cognitive),
            "social" => Some(MilestoneCategory::Social),
            "language" => Some(MilestoneCategory::Language),
            "custom" => Some(MilestoneCategory::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Milestone {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for Milestone {
    const KIND: ActivityKind = ActivityKind::Milestone;
    const TABLE: &'static str = "milestones";
    const TIME_COLUMN: &'static str = "date";

    fn id(&self) -> Uuid {
        self.id
    }

    fn baby_id(&self) -> Uuid {
        self.baby_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }
}

#[derive(Debug, Clone)]
pub struct MilestoneInput {
    pub baby_id: Uuid,
    pub date: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub category: MilestoneCategory,
}

#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub date: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<MilestoneCategory>,
}

impl MilestonePatch {
    pub fn apply(self, current: &Milestone) -> MilestoneInput {
        MilestoneInput {
            baby_id: current.baby_id,
            date: self.date.unwrap_or(current.date),
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: self.description.or_else(|| current.description.clone()),
            category: self
                .category
                .or_else(|| MilestoneCategory::from_str(&current.category))
                .unwrap_or(MilestoneCategory::Custom),
        }
    }
}

impl Milestone {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: MilestoneInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            INSERT INTO milestones
                (family_id, baby_id, caretaker_id, date, title, description, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.date)
        .bind(input.title)
        .bind(input.description)
        .bind(input.category.as_str())
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: MilestoneInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Milestone>(
            r#"
            UPDATE milestones
            SET date = $3, title = $4, description = $5, category = $6, updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.date)
        .bind(input.title)
        .bind(input.description)
        .bind(input.category.as_str())
        .fetch_optional(pool)
        .await
    }
}
