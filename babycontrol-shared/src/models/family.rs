/// Family model and database operations
///
/// A family is the tenant unit: caretakers, babies, logs and settings all
/// belong to exactly one family, addressed publicly by its slug.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE families (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     slug VARCHAR(50) NOT NULL UNIQUE,
///     name VARCHAR(100) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     account_id UUID REFERENCES accounts(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use babycontrol_shared::models::family::{CreateFamily, Family};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let family = Family::create(&pool, CreateFamily {
///     slug: "smith-family".to_string(),
///     name: "The Smiths".to_string(),
///     account_id: None,
/// }).await?;
///
/// let found = Family::find_by_slug(&pool, "smith-family").await?;
/// assert_eq!(found.map(|f| f.id), Some(family.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Family {
    pub id: Uuid,

    /// URL-safe unique identifier used on the login page
    pub slug: String,

    pub name: String,

    /// Inactive families cannot log in
    pub is_active: bool,

    /// Owning SaaS account, if any
    pub account_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a family, served before login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilySummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
}

impl From<&Family> for FamilySummary {
    fn from(family: &Family) -> Self {
        Self {
            id: family.id,
            slug: family.slug.clone(),
            name: family.name.clone(),
            is_active: family.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFamily {
    pub slug: String,
    pub name: String,
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFamily {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateFamily {
    pub fn is_empty(&self) -> bool {
        self.slug.is_none() && self.name.is_none() && self.is_active.is_none()
    }
}

const COLUMNS: &str = "id, slug, name, is_active, account_id, created_at, updated_at";

impl Family {
    /// Inserts a family; usable inside a transaction
    ///
    /// # Errors
    ///
    /// A duplicate slug surfaces as a unique violation on `families_slug_key`.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateFamily,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Family>(&format!(
            "INSERT INTO families (slug, name, account_id) VALUES ($1, $2, $3) RETURNING {}",
            COLUMNS
        ))
        .bind(data.slug)
        .bind(data.name)
        .bind(data.account_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Family>(&format!("SELECT {} FROM families WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Family>(&format!("SELECT {} FROM families WHERE slug = $1", COLUMNS))
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Whether any family already uses `slug`
    pub async fn slug_exists(pool: &PgPool, slug: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM families WHERE slug = $1)")
                .bind(slug)
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Updates the provided fields only
    ///
    /// Returns `None` if the family doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateFamily,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE families SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.slug.is_some() {
            bind_count += 1;
            query.push_str(&format!(", slug = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", COLUMNS));

        let mut q = sqlx::query_as::<_, Family>(&query).bind(id);

        if let Some(slug) = data.slug {
            q = q.bind(slug);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        q.fetch_optional(pool).await
    }

    /// Lists families, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Family>(&format!(
            "SELECT {} FROM families ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM families")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_family_default_is_empty() {
        assert!(UpdateFamily::default().is_empty());

        let update = UpdateFamily {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_summary_omits_account() {
        let family = Family {
            id: Uuid::new_v4(),
            slug: "smith".to_string(),
            name: "Smith".to_string(),
            is_active: true,
            account_id: Some(Uuid::new_v4()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(FamilySummary::from(&family)).unwrap();
        assert_eq!(json["slug"], "smith");
        assert!(json.get("account_id").is_none());
    }
}
