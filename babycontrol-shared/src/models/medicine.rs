/// Medicine catalogue kept per family
///
/// Medicine logs reference these rows; `dose_min_time` is the minimum
/// `HH:MM` spacing between two doses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Medicine {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub typical_dose_size: Option<f64>,
    pub unit_abbr: Option<String>,
    pub dose_min_time: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateMedicine {
    pub family_id: Uuid,
    pub name: String,
    pub typical_dose_size: Option<f64>,
    pub unit_abbr: Option<String>,
    pub dose_min_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMedicine {
    pub name: Option<String>,
    pub typical_dose_size: Option<f64>,
    pub unit_abbr: Option<String>,
    pub dose_min_time: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

impl Medicine {
    pub async fn create(pool: &PgPool, data: CreateMedicine) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Medicine>(
            r#"
            INSERT INTO medicines
                (family_id, name, typical_dose_size, unit_abbr, dose_min_time, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.family_id)
        .bind(data.name)
        .bind(data.typical_dose_size)
        .bind(data.unit_abbr)
        .bind(data.dose_min_time)
        .bind(data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Medicine>(
            "SELECT * FROM medicines WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(family_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_family(
        pool: &PgPool,
        family_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Medicine>(
            "SELECT * FROM medicines WHERE family_id = $1 AND deleted_at IS NULL \
             AND (NOT $2 OR active) ORDER BY name, id",
        )
        .bind(family_id)
        .bind(active_only)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        data: UpdateMedicine,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE medicines SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.typical_dose_size.is_some() {
            bind_count += 1;
            query.push_str(&format!(", typical_dose_size = ${}", bind_count));
        }
        if data.unit_abbr.is_some() {
            bind_count += 1;
            query.push_str(&format!(", unit_abbr = ${}", bind_count));
        }
        if data.dose_min_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", dose_min_time = ${}", bind_count));
        }
        if data.notes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", notes = ${}", bind_count));
        }
        if data.active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", active = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL RETURNING *");

        let mut q = sqlx::query_as::<_, Medicine>(&query).bind(id).bind(family_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(size) = data.typical_dose_size {
            q = q.bind(size);
        }
        if let Some(unit) = data.unit_abbr {
            q = q.bind(unit);
        }
        if let Some(min_time) = data.dose_min_time {
            q = q.bind(min_time);
        }
        if let Some(notes) = data.notes {
            q = q.bind(notes);
        }
        if let Some(active) = data.active {
            q = q.bind(active);
        }

        q.fetch_optional(pool).await
    }

    pub async fn soft_delete(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE medicines SET deleted_at = NOW(), active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(family_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
