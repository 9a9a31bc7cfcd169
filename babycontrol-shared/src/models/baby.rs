/// Baby model and database operations
///
/// Warning times are `HH:MM` strings: a feed or diaper change is overdue once
/// that much time has passed since the last one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_FEED_WARNING_TIME: &str = "03:00";
pub const DEFAULT_DIAPER_WARNING_TIME: &str = "02:00";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Baby {
    pub id: Uuid,
    pub family_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub inactive: bool,
    pub feed_warning_time: String,
    pub diaper_warning_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateBaby {
    pub family_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub feed_warning_time: Option<String>,
    pub diaper_warning_time: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBaby {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub inactive: Option<bool>,
    pub feed_warning_time: Option<String>,
    pub diaper_warning_time: Option<String>,
}

const COLUMNS: &str = "id, family_id, first_name, last_name, birth_date, gender, inactive, \
    feed_warning_time, diaper_warning_time, created_at, updated_at, deleted_at";

impl Baby {
    pub async fn create(pool: &PgPool, data: CreateBaby) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Baby>(&format!(
            "INSERT INTO babies (family_id, first_name, last_name, birth_date, gender, \
             feed_warning_time, diaper_warning_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            COLUMNS
        ))
        .bind(data.family_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.birth_date)
        .bind(data.gender)
        .bind(
            data.feed_warning_time
                .unwrap_or_else(|| DEFAULT_FEED_WARNING_TIME.to_string()),
        )
        .bind(
            data.diaper_warning_time
                .unwrap_or_else(|| DEFAULT_DIAPER_WARNING_TIME.to_string()),
        )
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Baby>(&format!(
            "SELECT {} FROM babies WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
            COLUMNS
        ))
        .bind(id)
        .bind(family_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn belongs_to_family(
        pool: &PgPool,
        id: Uuid,
        family_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM babies \
             WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL)",
        )
        .bind(id)
        .bind(family_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists a family's babies by first name
    pub async fn list_by_family(
        pool: &PgPool,
        family_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Baby>(&format!(
            "SELECT {} FROM babies WHERE family_id = $1 AND deleted_at IS NULL \
             AND ($2 OR NOT inactive) ORDER BY first_name, id",
            COLUMNS
        ))
        .bind(family_id)
        .bind(include_inactive)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        data: UpdateBaby,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE babies SET updated_at = NOW()");
        let mut bind_count = 2;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };
        push("first_name", data.first_name.is_some());
        push("last_name", data.last_name.is_some());
        push("birth_date", data.birth_date.is_some());
        push("gender", data.gender.is_some());
        push("inactive", data.inactive.is_some());
        push("feed_warning_time", data.feed_warning_time.is_some());
        push("diaper_warning_time", data.diaper_warning_time.is_some());

        query.push_str(&format!(
            " WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL RETURNING {}",
            COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Baby>(&query).bind(id).bind(family_id);

        if let Some(v) = data.first_name {
            q = q.bind(v);
        }
        if let Some(v) = data.last_name {
            q = q.bind(v);
        }
        if let Some(v) = data.birth_date {
            q = q.bind(v);
        }
        if let Some(v) = data.gender {
            q = q.bind(v);
        }
        if let Some(v) = data.inactive {
            q = q.bind(v);
        }
        if let Some(v) = data.feed_warning_time {
            q = q.bind(v);
        }
        if let Some(v) = data.diaper_warning_time {
            q = q.bind(v);
        }

        q.fetch_optional(pool).await
    }

    pub async fn soft_delete(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE babies SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(family_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
