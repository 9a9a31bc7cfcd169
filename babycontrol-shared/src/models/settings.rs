/// Family settings
///
/// One row per family holding the display name, the family security PIN and
/// the default unit for each measured activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Settings {
    pub id: Uuid,
    pub family_id: Uuid,
    pub family_name: String,

    /// Argon2 hash of the family PIN; never serialized
    #[serde(skip_serializing, default)]
    pub security_pin_hash: String,

    pub default_bottle_unit: String,
    pub default_solids_unit: String,
    pub default_height_unit: String,
    pub default_weight_unit: String,
    pub default_temp_unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSettings {
    pub family_id: Uuid,
    pub family_name: String,
    pub security_pin_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub family_name: Option<String>,
    pub security_pin_hash: Option<String>,
    pub default_bottle_unit: Option<String>,
    pub default_solids_unit: Option<String>,
    pub default_height_unit: Option<String>,
    pub default_weight_unit: Option<String>,
    pub default_temp_unit: Option<String>,
}

const COLUMNS: &str = "id, family_id, family_name, security_pin_hash, default_bottle_unit, \
    default_solids_unit, default_height_unit, default_weight_unit, default_temp_unit, \
    created_at, updated_at";

impl Settings {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateSettings,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Settings>(&format!(
            "INSERT INTO settings (family_id, family_name, security_pin_hash) \
             VALUES ($1, $2, $3) RETURNING {}",
            COLUMNS
        ))
        .bind(data.family_id)
        .bind(data.family_name)
        .bind(data.security_pin_hash)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_family(
        pool: &PgPool,
        family_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Settings>(&format!(
            "SELECT {} FROM settings WHERE family_id = $1",
            COLUMNS
        ))
        .bind(family_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        family_id: Uuid,
        data: UpdateSettings,
    ) -> Result<Option<Self>, sqlx::Error> {
        let fields = [
            ("family_name", data.family_name),
            ("security_pin_hash", data.security_pin_hash),
            ("default_bottle_unit", data.default_bottle_unit),
            ("default_solids_unit", data.default_solids_unit),
            ("default_height_unit", data.default_height_unit),
            ("default_weight_unit", data.default_weight_unit),
            ("default_temp_unit", data.default_temp_unit),
        ];

        let mut query = String::from("UPDATE settings SET updated_at = NOW()");
        let mut values = Vec::new();
        for (column, value) in fields {
            if let Some(value) = value {
                values.push(value);
                query.push_str(&format!(", {} = ${}", column, values.len() + 1));
            }
        }
        query.push_str(&format!(" WHERE family_id = $1 RETURNING {}", COLUMNS));

        let mut q = sqlx::query_as::<_, Settings>(&query).bind(family_id);
        for value in values {
            q = q.bind(value);
        }

        q.fetch_optional(pool).await
    }
}
