/// Free-text notes about a baby

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{ActivityKind, ActivityLog};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub time: DateTime<Utc>,
    pub content: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for Note {
    const KIND: ActivityKind = ActivityKind::Note;
    const TABLE: &'static str = "notes";
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
pub struct NoteInput {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,
    pub content: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub time: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub category: Option<String>,
}

impl NotePatch {
    pub fn apply(self, current: &Note) -> NoteInput {
        NoteInput {
            baby_id: current.baby_id,
            time: self.time.unwrap_or(current.time),
            content: self.content.unwrap_or_else(|| current.content.clone()),
            category: self.category.or_else(|| current.category.clone()),
        }
    }
}

impl Note {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: NoteInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (family_id, baby_id, caretaker_id, time, content, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.time)
        .bind(input.content)
        .bind(input.category)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: NoteInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET time = $3, content = $4, category = $5, updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.time)
        .bind(input.content)
        .bind(input.category)
        .fetch_optional(pool)
        .await
    }
}
