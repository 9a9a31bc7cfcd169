/// Instance-wide configuration (singleton row)
///
/// Holds the system administrator password hash along with the domain the
/// instance is served from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppConfig {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    pub admin_pass_hash: String,
    pub root_domain: String,
    pub enable_https: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAppConfig {
    pub admin_pass_hash: Option<String>,
    pub root_domain: Option<String>,
    pub enable_https: Option<bool>,
}

impl AppConfig {
    pub async fn get(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AppConfig>("SELECT * FROM app_config ORDER BY created_at LIMIT 1")
            .fetch_optional(pool)
            .await
    }

    /// Returns the existing row, creating it with `admin_pass_hash` if absent
    pub async fn ensure(pool: &PgPool, admin_pass_hash: &str) -> Result<Self, sqlx::Error> {
        if let Some(existing) = Self::get(pool).await? {
            return Ok(existing);
        }

        sqlx::query_as::<_, AppConfig>(
            "INSERT INTO app_config (admin_pass_hash) VALUES ($1) RETURNING *",
        )
        .bind(admin_pass_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAppConfig,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AppConfig>(
            r#"
            UPDATE app_config
            SET admin_pass_hash = COALESCE($2, admin_pass_hash),
                root_domain = COALESCE($3, root_domain),
                enable_https = COALESCE($4, enable_https),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.admin_pass_hash)
        .bind(data.root_domain)
        .bind(data.enable_https)
        .fetch_optional(pool)
        .await
    }
}
