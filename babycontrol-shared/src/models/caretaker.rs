/// Caretaker model and database operations
///
/// Caretakers are the people who log activities. Each logs in with the
/// family slug, a two-digit login ID and a security PIN.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE caretaker_role AS ENUM ('admin', 'user');
///
/// CREATE TABLE caretakers (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
///     login_id VARCHAR(2) NOT NULL,
///     name VARCHAR(100) NOT NULL,
///     caretaker_type VARCHAR(50),
///     role caretaker_role NOT NULL DEFAULT 'user',
///     security_pin_hash VARCHAR(255) NOT NULL,
///     inactive BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// -- unique (family_id, login_id) among non-deleted rows
/// ```
///
/// # Roles
///
/// - **admin**: manages caretakers, babies and family settings
/// - **user**: logs activities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "caretaker_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CaretakerRole {
    Admin,
    User,
}

impl CaretakerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaretakerRole::Admin => "admin",
            CaretakerRole::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(CaretakerRole::Admin),
            "user" => Some(CaretakerRole::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Caretaker {
    pub id: Uuid,
    pub family_id: Uuid,

    /// Two-digit login ID, unique within the family
    pub login_id: String,

    pub name: String,

    /// Free-form relationship label ("Parent", "Nanny", ...)
    pub caretaker_type: Option<String>,

    pub role: CaretakerRole,

    #[serde(skip_serializing, default)]
    pub security_pin_hash: String,

    /// Inactive caretakers cannot log in
    pub inactive: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Caretaker {
    pub fn is_active_admin(&self) -> bool {
        self.role == CaretakerRole::Admin && !self.inactive && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CreateCaretaker {
    pub family_id: Uuid,
    pub login_id: String,
    pub name: String,
    pub caretaker_type: Option<String>,
    pub role: CaretakerRole,
    pub security_pin_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCaretaker {
    pub login_id: Option<String>,
    pub name: Option<String>,
    pub caretaker_type: Option<String>,
    pub role: Option<CaretakerRole>,
    pub security_pin_hash: Option<String>,
    pub inactive: Option<bool>,
}

impl UpdateCaretaker {
    /// Whether applying this update would take `current` out of the admin pool
    pub fn removes_admin(&self, current: &Caretaker) -> bool {
        current.is_active_admin()
            && (self.role == Some(CaretakerRole::User) || self.inactive == Some(true))
    }
}

const COLUMNS: &str = "id, family_id, login_id, name, caretaker_type, role, security_pin_hash, \
    inactive, created_at, updated_at, deleted_at";

impl Caretaker {
    /// # Errors
    ///
    /// A login ID already used in the family surfaces as a unique violation
    /// on `caretakers_family_login_key`.
    pub async fn create(pool: &PgPool, data: CreateCaretaker) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Caretaker>(&format!(
            "INSERT INTO caretakers \
             (family_id, login_id, name, caretaker_type, role, security_pin_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLUMNS
        ))
        .bind(data.family_id)
        .bind(data.login_id)
        .bind(data.name)
        .bind(data.caretaker_type)
        .bind(data.role)
        .bind(data.security_pin_hash)
        .fetch_one(pool)
        .await
    }

    /// Finds a non-deleted caretaker within a family
    pub async fn find_by_id(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Caretaker>(&format!(
            "SELECT {} FROM caretakers WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
            COLUMNS
        ))
        .bind(id)
        .bind(family_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_login_id(
        pool: &PgPool,
        family_id: Uuid,
        login_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Caretaker>(&format!(
            "SELECT {} FROM caretakers \
             WHERE family_id = $1 AND login_id = $2 AND deleted_at IS NULL",
            COLUMNS
        ))
        .bind(family_id)
        .bind(login_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists non-deleted caretakers ordered by login ID
    pub async fn list_by_family(pool: &PgPool, family_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Caretaker>(&format!(
            "SELECT {} FROM caretakers \
             WHERE family_id = $1 AND deleted_at IS NULL ORDER BY login_id",
            COLUMNS
        ))
        .bind(family_id)
        .fetch_all(pool)
        .await
    }

    /// Counts caretakers able to log in
    pub async fn count_active(pool: &PgPool, family_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM caretakers \
             WHERE family_id = $1 AND deleted_at IS NULL AND NOT inactive",
        )
        .bind(family_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn count_active_admins(pool: &PgPool, family_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM caretakers \
             WHERE family_id = $1 AND deleted_at IS NULL AND NOT inactive AND role = 'admin'",
        )
        .bind(family_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates the provided fields only
    pub async fn update(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        data: UpdateCaretaker,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE caretakers SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.login_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", login_id = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.caretaker_type.is_some() {
            bind_count += 1;
            query.push_str(&format!(", caretaker_type = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.security_pin_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", security_pin_hash = ${}", bind_count));
        }
        if data.inactive.is_some() {
            bind_count += 1;
            query.push_str(&format!(", inactive = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL RETURNING {}",
            COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Caretaker>(&query).bind(id).bind(family_id);

        if let Some(login_id) = data.login_id {
            q = q.bind(login_id);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(caretaker_type) = data.caretaker_type {
            q = q.bind(caretaker_type);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(hash) = data.security_pin_hash {
            q = q.bind(hash);
        }
        if let Some(inactive) = data.inactive {
            q = q.bind(inactive);
        }

        q.fetch_optional(pool).await
    }

    /// Marks a caretaker deleted; the login ID becomes reusable
    pub async fn soft_delete(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE caretakers SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(family_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caretaker(role: CaretakerRole, inactive: bool) -> Caretaker {
        Caretaker {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            login_id: "01".to_string(),
            name: "Pat".to_string(),
            caretaker_type: Some("Parent".to_string()),
            role,
            security_pin_hash: "$argon2id$hash".to_string(),
            inactive,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_role_strings() {
        assert_eq!(CaretakerRole::Admin.as_str(), "admin");
        assert_eq!(CaretakerRole::from_str("user"), Some(CaretakerRole::User));
        assert_eq!(CaretakerRole::from_str("owner"), None);
    }

    #[test]
    fn test_removes_admin() {
        let admin = caretaker(CaretakerRole::Admin, false);

        let demote = UpdateCaretaker {
            role: Some(CaretakerRole::User),
            ..Default::default()
        };
        assert!(demote.removes_admin(&admin));

        let deactivate = UpdateCaretaker {
            inactive: Some(true),
            ..Default::default()
        };
        assert!(deactivate.removes_admin(&admin));

        let rename = UpdateCaretaker {
            name: Some("Sam".to_string()),
            ..Default::default()
        };
        assert!(!rename.removes_admin(&admin));

        let user = caretaker(CaretakerRole::User, false);
        assert!(!demote.removes_admin(&user));
    }

    #[test]
    fn test_serialization_hides_pin() {
        let json = serde_json::to_value(caretaker(CaretakerRole::User, false)).unwrap();
        assert!(json.get("security_pin_hash").is_none());
        assert_eq!(json["role"], "user");
    }
}
