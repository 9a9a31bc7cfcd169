/// One-time family setup invitations
///
/// A system administrator hands out a token; whoever redeems it before
/// `expires_at` creates a new family. Redeeming marks the invite used inside
/// the family-creation transaction.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Invite lifetime
pub const INVITE_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FamilySetupInvite {
    pub id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub family_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generates a 64-character hex invite token
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

impl FamilySetupInvite {
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }

    pub async fn create(pool: &PgPool, created_by: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FamilySetupInvite>(
            "INSERT INTO family_setup_invites (token, expires_at, created_by) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(generate_token())
        .bind(Utc::now() + Duration::days(INVITE_TTL_DAYS))
        .bind(created_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_token<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FamilySetupInvite>(
            "SELECT * FROM family_setup_invites WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(executor)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, FamilySetupInvite>(
            "SELECT * FROM family_setup_invites ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Marks the invite used; returns false if it was already used
    pub async fn mark_used<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        family_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE family_setup_invites SET used = TRUE, family_id = $2, updated_at = NOW() \
             WHERE id = $1 AND NOT used",
        )
        .bind(id)
        .bind(family_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_is_redeemable() {
        let now = Utc::now();
        let mut invite = FamilySetupInvite {
            id: Uuid::new_v4(),
            token: generate_token(),
            expires_at: now + Duration::hours(1),
            used: false,
            family_id: None,
            created_by: Some("sysadmin".to_string()),
            created_at: now,
            updated_at: now,
        };
        assert!(invite.is_redeemable(now));

        invite.expires_at = now - Duration::seconds(1);
        assert!(!invite.is_redeemable(now));

        invite.expires_at = now + Duration::hours(1);
        invite.used = true;
        assert!(!invite.is_redeemable(now));
    }
}
