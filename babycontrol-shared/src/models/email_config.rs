/// Outbound email provider configuration (singleton row)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Console,
    Sendgrid,
    Smtp2go,
}

impl EmailProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailProvider::Console => "console",
            EmailProvider::Sendgrid => "sendgrid",
            EmailProvider::Smtp2go => "smtp2go",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Some(EmailProvider::Console),
            "sendgrid" => Some(EmailProvider::Sendgrid),
            "smtp2go" => Some(EmailProvider::Smtp2go),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailConfig {
    pub id: Uuid,
    pub provider_type: String,
    #[serde(skip_serializing, default)]
    pub sendgrid_api_key: Option<String>,
    #[serde(skip_serializing, default)]
    pub smtp2go_api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEmailConfig {
    pub provider_type: Option<EmailProvider>,
    pub sendgrid_api_key: Option<String>,
    pub smtp2go_api_key: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
}

impl EmailConfig {
    pub fn provider(&self) -> EmailProvider {
        EmailProvider::from_str(&self.provider_type).unwrap_or(EmailProvider::Console)
    }

    pub fn has_sendgrid_key(&self) -> bool {
        self.sendgrid_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_smtp2go_key(&self) -> bool {
        self.smtp2go_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub async fn get(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailConfig>("SELECT * FROM email_config ORDER BY created_at LIMIT 1")
            .fetch_optional(pool)
            .await
    }

    /// Returns the singleton, inserting a console-provider row if none exists
    pub async fn ensure(pool: &PgPool) -> Result<Self, sqlx::Error> {
        if let Some(existing) = Self::get(pool).await? {
            return Ok(existing);
        }

        sqlx::query_as::<_, EmailConfig>("INSERT INTO email_config DEFAULT VALUES RETURNING *")
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateEmailConfig,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailConfig>(
            r#"
            UPDATE email_config
            SET provider_type = COALESCE($2, provider_type),
                sendgrid_api_key = COALESCE($3, sendgrid_api_key),
                smtp2go_api_key = COALESCE($4, smtp2go_api_key),
                sender_email = COALESCE($5, sender_email),
                sender_name = COALESCE($6, sender_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.provider_type.map(|p| p.as_str()))
        .bind(data.sendgrid_api_key)
        .bind(data.smtp2go_api_key)
        .bind(data.sender_email)
        .bind(data.sender_name)
        .fetch_optional(pool)
        .await
    }
}
