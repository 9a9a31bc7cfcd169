/// Account model and database operations
///
/// Accounts exist only in SaaS deployments. An account owns at most one
/// family and carries the billing state that Stripe webhooks reconcile.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,           -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100),
///     verified BOOLEAN NOT NULL DEFAULT FALSE,
///     verification_token VARCHAR(128),   -- SHA-256 hex of the emailed token
///     password_reset_token VARCHAR(128), -- SHA-256 hex of the emailed token
///     password_reset_expires TIMESTAMPTZ,
///     beta_participant BOOLEAN NOT NULL DEFAULT FALSE,
///     trial_ends TIMESTAMPTZ,
///     plan_type VARCHAR(10),                 -- 'sub' | 'full'
///     plan_expires TIMESTAMPTZ,
///     subscription_id VARCHAR(255),
///     stripe_customer_id VARCHAR(255),
///     closed BOOLEAN NOT NULL DEFAULT FALSE,
///     closed_at TIMESTAMPTZ,
///     family_id UUID REFERENCES families(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Access status
///
/// Evaluated in order, first match wins:
///
/// 1. closed → `closed`
/// 2. `plan_type = full` → `lifetime`
/// 3. `plan_type = sub` and `plan_expires` in the future, or unset while a
///    subscription ID exists → `active`
/// 4. `trial_ends` in the future → `trial`
/// 5. beta participant → `active`
/// 6. otherwise → `expired`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Purchased plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    /// Recurring subscription
    Sub,

    /// One-off lifetime purchase
    Full,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Sub => "sub",
            PlanType::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sub" => Some(PlanType::Sub),
            "full" => Some(PlanType::Full),
            _ => None,
        }
    }
}

/// Computed access status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Trial,
    Active,
    Lifetime,
    Expired,
    Closed,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Trial => "trial",
            AccessStatus::Active => "active",
            AccessStatus::Lifetime => "lifetime",
            AccessStatus::Expired => "expired",
            AccessStatus::Closed => "closed",
        }
    }

    /// Whether the account's family may still record data
    pub fn allows_writes(&self) -> bool {
        !matches!(self, AccessStatus::Expired | AccessStatus::Closed)
    }
}

/// The four billing columns Stripe reconciliation owns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingState {
    pub plan_type: Option<PlanType>,
    pub plan_expires: Option<DateTime<Utc>>,
    pub subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: Option<String>,
    pub verified: bool,

    #[serde(skip_serializing, default)]
    pub verification_token: Option<String>,

    #[serde(skip_serializing, default)]
    pub password_reset_token: Option<String>,

    #[serde(skip_serializing, default)]
    pub password_reset_expires: Option<DateTime<Utc>>,

    pub beta_participant: bool,
    pub trial_ends: Option<DateTime<Utc>>,
    pub plan_type: Option<String>,
    pub plan_expires: Option<DateTime<Utc>>,
    pub subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub family_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn plan(&self) -> Option<PlanType> {
        self.plan_type.as_deref().and_then(PlanType::from_str)
    }

    pub fn access_status(&self, now: DateTime<Utc>) -> AccessStatus {
        if self.closed {
            return AccessStatus::Closed;
        }

        match self.plan() {
            Some(PlanType::Full) => return AccessStatus::Lifetime,
            Some(PlanType::Sub) => {
                let current = match self.plan_expires {
                    Some(expires) => expires > now,
                    None => self.subscription_id.is_some(),
                };
                if current {
                    return AccessStatus::Active;
                }
            }
            None => {}
        }

        if self.trial_ends.is_some_and(|ends| ends > now) {
            return AccessStatus::Trial;
        }

        if self.beta_participant {
            return AccessStatus::Active;
        }

        AccessStatus::Expired
    }

    pub fn billing_state(&self) -> BillingState {
        BillingState {
            plan_type: self.plan(),
            plan_expires: self.plan_expires,
            subscription_id: self.subscription_id.clone(),
            stripe_customer_id: self.stripe_customer_id.clone(),
        }
    }

    /// Hashes an emailed token for storage and lookup
    ///
    /// Only the SHA-256 hex digest is stored; the raw token exists in the
    /// email alone.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether a reset token is present and unexpired
    pub fn reset_token_valid(&self, now: DateTime<Utc>) -> bool {
        self.password_reset_token.is_some()
            && self.password_reset_expires.is_some_and(|expires| expires > now)
    }
}

#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: Option<String>,

    /// Raw token as emailed; stored hashed
    pub verification_token: String,

    pub trial_ends: DateTime<Utc>,
}

const COLUMNS: &str = "id, email, password_hash, first_name, last_name, verified, \
    verification_token, password_reset_token, password_reset_expires, beta_participant, \
    trial_ends, plan_type, plan_expires, subscription_id, stripe_customer_id, closed, \
    closed_at, family_id, created_at, updated_at";

impl Account {
    /// # Errors
    ///
    /// A duplicate email (case-insensitive) surfaces as a unique violation on
    /// `accounts_email_key`.
    pub async fn create(pool: &PgPool, data: CreateAccount) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts \
             (email, password_hash, first_name, last_name, verification_token, trial_ends) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLUMNS
        ))
        .bind(data.email.trim().to_lowercase())
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(Self::hash_token(&data.verification_token))
        .bind(data.trial_ends)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!("SELECT {} FROM accounts WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE LOWER(email) = LOWER($1)",
            COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_family(
        pool: &PgPool,
        family_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE family_id = $1",
            COLUMNS
        ))
        .bind(family_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_verification_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE verification_token = $1",
            COLUMNS
        ))
        .bind(Self::hash_token(token))
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_reset_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE password_reset_token = $1",
            COLUMNS
        ))
        .bind(Self::hash_token(token))
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_subscription_id(
        pool: &PgPool,
        subscription_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE subscription_id = $1",
            COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_stripe_customer_id(
        pool: &PgPool,
        customer_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE stripe_customer_id = $1 ORDER BY created_at LIMIT 1",
            COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(pool)
        .await
    }

    /// Marks the account verified and consumes the token
    pub async fn mark_verified(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET verified = TRUE, verification_token = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores the hash of a freshly emailed reset token
    pub async fn set_password_reset(
        pool: &PgPool,
        id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET password_reset_token = $2, password_reset_expires = $3, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(Self::hash_token(token))
        .bind(expires)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets a new password hash and clears any pending reset token
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, password_reset_token = NULL, \
             password_reset_expires = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Links the account to its family; usable inside a transaction
    pub async fn set_family<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        family_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET family_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(family_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn close(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts SET closed = TRUE, closed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND NOT closed RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Overwrites the billing columns
    pub async fn set_billing_state(
        pool: &PgPool,
        id: Uuid,
        state: &BillingState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE accounts SET plan_type = $2, plan_expires = $3, subscription_id = $4, \
             stripe_customer_id = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(state.plan_type.map(|p| p.as_str()))
        .bind(state.plan_expires)
        .bind(state.subscription_id.as_deref())
        .bind(state.stripe_customer_id.as_deref())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "parent@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            first_name: "Pat".to_string(),
            last_name: None,
            verified: true,
            verification_token: None,
            password_reset_token: None,
            password_reset_expires: None,
            beta_participant: false,
            trial_ends: None,
            plan_type: None,
            plan_expires: None,
            subscription_id: None,
            stripe_customer_id: None,
            closed: false,
            closed_at: None,
            family_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_type_strings() {
        assert_eq!(PlanType::Sub.as_str(), "sub");
        assert_eq!(PlanType::from_str("full"), Some(PlanType::Full));
        assert_eq!(PlanType::from_str("monthly"), None);
    }

    #[test]
    fn test_no_plan_no_trial_is_expired() {
        assert_eq!(account().access_status(Utc::now()), AccessStatus::Expired);
    }

    #[test]
    fn test_closed_wins_over_everything() {
        let mut a = account();
        a.plan_type = Some("full".to_string());
        a.closed = true;
        assert_eq!(a.access_status(Utc::now()), AccessStatus::Closed);
    }

    #[test]
    fn test_full_plan_is_lifetime() {
        let mut a = account();
        a.plan_type = Some("full".to_string());
        a.plan_expires = Some(Utc::now() - Duration::days(400));
        assert_eq!(a.access_status(Utc::now()), AccessStatus::Lifetime);
    }

    #[test]
    fn test_subscription_rules() {
        let now = Utc::now();
        let mut a = account();
        a.plan_type = Some("sub".to_string());

        a.plan_expires = Some(now + Duration::days(3));
        assert_eq!(a.access_status(now), AccessStatus::Active);

        a.plan_expires = Some(now - Duration::days(1));
        assert_eq!(a.access_status(now), AccessStatus::Expired);

        a.plan_expires = None;
        a.subscription_id = Some("sub_123".to_string());
        assert_eq!(a.access_status(now), AccessStatus::Active);

        a.subscription_id = None;
        assert_eq!(a.access_status(now), AccessStatus::Expired);
    }

    #[test]
    fn test_lapsed_subscription_falls_back_to_trial() {
        let now = Utc::now();
        let mut a = account();
        a.plan_type = Some("sub".to_string());
        a.plan_expires = Some(now - Duration::days(1));
        a.trial_ends = Some(now + Duration::days(2));
        assert_eq!(a.access_status(now), AccessStatus::Trial);
    }

    #[test]
    fn test_trial_and_beta() {
        let now = Utc::now();
        let mut a = account();
        a.trial_ends = Some(now + Duration::days(14));
        assert_eq!(a.access_status(now), AccessStatus::Trial);

        a.trial_ends = Some(now - Duration::days(1));
        assert_eq!(a.access_status(now), AccessStatus::Expired);

        a.beta_participant = true;
        assert_eq!(a.access_status(now), AccessStatus::Active);
    }

    #[test]
    fn test_allows_writes() {
        assert!(AccessStatus::Trial.allows_writes());
        assert!(AccessStatus::Active.allows_writes());
        assert!(AccessStatus::Lifetime.allows_writes());
        assert!(!AccessStatus::Expired.allows_writes());
        assert!(!AccessStatus::Closed.allows_writes());
    }

    #[test]
    fn test_reset_token_validity() {
        let now = Utc::now();
        let mut a = account();
        assert!(!a.reset_token_valid(now));

        a.password_reset_token = Some("tok".to_string());
        a.password_reset_expires = Some(now + Duration::minutes(30));
        assert!(a.reset_token_valid(now));

        a.password_reset_expires = Some(now - Duration::minutes(1));
        assert!(!a.reset_token_valid(now));
    }

    #[test]
    fn test_hash_token() {
        let hashed = Account::hash_token("verify-me");
        assert_eq!(hashed.len(), 64);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, Account::hash_token("verify-me"));
        assert_ne!(hashed, Account::hash_token("verify-me2"));
        assert_eq!(
            Account::hash_token(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let mut a = account();
        a.verification_token = Some("verify-me".to_string());
        let json = serde_json::to_string(&a).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("verify-me"));
    }
}
