/// JWT token generation and validation module
///
/// Tokens are signed using HS256 (HMAC-SHA256) and carry the identity of the
/// caller (caretaker, family system login, SaaS account or system admin)
/// together with the family they act on.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: 24 hours for access, 30 days for refresh
/// - **Validation**: Signature, expiration, not-before and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use babycontrol_shared::auth::jwt::{create_token, validate_token, Claims, Principal, TokenType};
/// use babycontrol_shared::models::caretaker::CaretakerRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let caretaker_id = Uuid::new_v4();
/// let family_id = Uuid::new_v4();
///
/// let claims = Claims::new(
///     caretaker_id,
///     Principal::Caretaker,
///     Some(family_id),
///     Some(CaretakerRole::User),
///     TokenType::Access,
/// );
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, caretaker_id);
/// assert_eq!(validated.family_id, Some(family_id));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::caretaker::CaretakerRole;

/// Issuer claim placed in and required on every token
pub const ISSUER: &str = "babycontrol";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token of the wrong kind was presented
    #[error("Expected {expected} token, got {actual}")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (24 hours)
    Access,

    /// Refresh token (30 days)
    Refresh,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Kind of identity a token represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    /// A caretaker who logged in with login id + PIN
    Caretaker,

    /// A family logged in with the family PIN before any caretaker exists
    FamilySystem,

    /// A SaaS account holder (email + password)
    Account,

    /// The deployment's system administrator
    SysAdmin,
}

impl Principal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Principal::Caretaker => "caretaker",
            Principal::FamilySystem => "family_system",
            Principal::Account => "account",
            Principal::SysAdmin => "sys_admin",
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (caretaker, family or account ID; nil UUID for sys admin)
/// - `iss`: Issuer (always "babycontrol")
/// - `iat`, `exp`, `nbf`: Unix timestamps
///
/// # Custom Claims
///
/// - `family_id`: Family the token acts on, if any
/// - `role`: Caretaker role within that family
/// - `principal`: Kind of identity
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<CaretakerRole>,

    pub principal: Principal,

    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default expiration for `token_type`
    pub fn new(
        subject: Uuid,
        principal: Principal,
        family_id: Option<Uuid>,
        role: Option<CaretakerRole>,
        token_type: TokenType,
    ) -> Self {
        Self::with_expiration(
            subject,
            principal,
            family_id,
            role,
            token_type,
            token_type.default_expiration(),
        )
    }

    /// Creates claims with a custom expiration
    pub fn with_expiration(
        subject: Uuid,
        principal: Principal,
        family_id: Option<Uuid>,
        role: Option<CaretakerRole>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: subject,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            family_id,
            role,
            principal,
            token_type,
        }
    }

    /// Claims for the system administrator
    pub fn sys_admin(token_type: TokenType) -> Self {
        Self::new(Uuid::nil(), Principal::SysAdmin, None, None, token_type)
    }

    /// Copies identity claims into a fresh token of another type
    pub fn reissue(&self, token_type: TokenType) -> Self {
        Self::new(self.sub, self.principal, self.family_id, self.role, token_type)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Seconds until the token expires, `None` if already expired
    pub fn expires_in_seconds(&self) -> Option<i64> {
        let now = Utc::now().timestamp();
        (self.exp > now).then(|| self.exp - now)
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies signature, expiration, not-before and issuer.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Issued access/refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Issues an access + refresh token pair for the same identity
pub fn issue_token_pair(claims: &Claims, secret: &str) -> Result<TokenPair, JwtError> {
    let access = claims.reissue(TokenType::Access);
    let refresh = claims.reissue(TokenType::Refresh);

    Ok(TokenPair {
        access_token: create_token(&access, secret)?,
        refresh_token: create_token(&refresh, secret)?,
        token_type: "Bearer",
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn caretaker_claims(token_type: TokenType) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            Principal::Caretaker,
            Some(Uuid::new_v4()),
            Some(CaretakerRole::Admin),
            token_type,
        )
    }

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = caretaker_claims(TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.family_id, claims.family_id);
        assert_eq!(validated.role, Some(CaretakerRole::Admin));
        assert_eq!(validated.principal, Principal::Caretaker);
        assert_eq!(validated.iss, "babycontrol");
    }

    #[test]
    fn test_sys_admin_claims_have_no_family() {
        let claims = Claims::sys_admin(TokenType::Access);
        let token = create_token(&claims, SECRET).unwrap();
        let validated = validate_access_token(&token, SECRET).unwrap();

        assert_eq!(validated.principal, Principal::SysAdmin);
        assert!(validated.family_id.is_none());
        assert!(validated.role.is_none());
        assert!(!token.contains("family_id"));
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&caretaker_claims(TokenType::Access), "secret1").unwrap();
        assert!(validate_token(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            Principal::Account,
            None,
            None,
            TokenType::Access,
            Duration::seconds(-3600),
        );

        assert!(claims.is_expired());
        assert!(claims.expires_in_seconds().is_none());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_type_is_enforced() {
        let access = create_token(&caretaker_claims(TokenType::Access), SECRET).unwrap();
        let refresh = create_token(&caretaker_claims(TokenType::Refresh), SECRET).unwrap();

        assert!(validate_access_token(&access, SECRET).is_ok());
        assert!(validate_refresh_token(&refresh, SECRET).is_ok());
        assert!(matches!(
            validate_access_token(&refresh, SECRET),
            Err(JwtError::WrongTokenType { .. })
        ));
        assert!(validate_refresh_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_reissue_keeps_identity() {
        let claims = caretaker_claims(TokenType::Refresh);
        let refresh_token = create_token(&claims, SECRET).unwrap();

        let refresh = validate_refresh_token(&refresh_token, SECRET).unwrap();
        let new_access = create_token(&refresh.reissue(TokenType::Access), SECRET).unwrap();
        let validated = validate_access_token(&new_access, SECRET).unwrap();

        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.family_id, claims.family_id);
        assert_eq!(validated.role, claims.role);
        assert_eq!(validated.principal, claims.principal);
    }

    #[test]
    fn test_issue_token_pair() {
        let claims = caretaker_claims(TokenType::Access);
        let pair = issue_token_pair(&claims, SECRET).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 86_400);
        assert!(validate_access_token(&pair.access_token, SECRET).is_ok());
        assert!(validate_refresh_token(&pair.refresh_token, SECRET).is_ok());
    }

    #[test]
    fn test_principal_serialization() {
        assert_eq!(
            serde_json::to_string(&Principal::FamilySystem).unwrap(),
            "\"family_system\""
        );
        assert_eq!(Principal::SysAdmin.as_str(), "sys_admin");
    }
}
