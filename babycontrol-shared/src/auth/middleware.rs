/// Request authentication for Axum
///
/// Extracts `Authorization: Bearer <token>` from request headers, validates
/// the access token and produces the [`AuthContext`] that handlers read from
/// request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use babycontrol_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Principal: {}, family: {:?}", auth.principal.as_str(), auth.family_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError, Principal};
use crate::models::caretaker::CaretakerRole;

/// Authentication context added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Caretaker, family, or account ID depending on `principal`
    pub subject_id: Uuid,

    pub principal: Principal,

    /// Family the caller acts on
    pub family_id: Option<Uuid>,

    /// Role within the family
    pub role: Option<CaretakerRole>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            subject_id: claims.sub,
            principal: claims.principal,
            family_id: claims.family_id,
            role: claims.role,
        }
    }

    /// Caretaker ID when the caller is a caretaker
    pub fn caretaker_id(&self) -> Option<Uuid> {
        (self.principal == Principal::Caretaker).then_some(self.subject_id)
    }

    /// Account ID when the caller is a SaaS account holder
    pub fn account_id(&self) -> Option<Uuid> {
        (self.principal == Principal::Account).then_some(self.subject_id)
    }

    /// Whether the caller administers its family
    pub fn is_admin(&self) -> bool {
        self.family_id.is_some() && self.role == Some(CaretakerRole::Admin)
    }

    pub fn is_sys_admin(&self) -> bool {
        self.principal == Principal::SysAdmin
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Invalid authorization header format
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

/// Pulls the bearer token out of the `Authorization` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the bearer access token in `headers`
pub fn authenticate_headers(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = extract_bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;
    Ok(AuthContext::from_claims(&claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, TokenType};
    use axum::http::HeaderValue;

    const SECRET: &str = "middleware-test-secret-32-bytes-long!!";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_caretaker_context() {
        let caretaker_id = Uuid::new_v4();
        let claims = Claims::new(
            caretaker_id,
            Principal::Caretaker,
            Some(Uuid::new_v4()),
            Some(CaretakerRole::User),
            TokenType::Access,
        );
        let context = AuthContext::from_claims(&claims);

        assert_eq!(context.caretaker_id(), Some(caretaker_id));
        assert_eq!(context.account_id(), None);
        assert!(!context.is_admin());
        assert!(!context.is_sys_admin());
    }

    #[test]
    fn test_family_system_context_is_admin() {
        let claims = Claims::new(
            Uuid::new_v4(),
            Principal::FamilySystem,
            Some(Uuid::new_v4()),
            Some(CaretakerRole::Admin),
            TokenType::Access,
        );
        let context = AuthContext::from_claims(&claims);

        assert!(context.is_admin());
        assert!(context.caretaker_id().is_none());
    }

    #[test]
    fn test_admin_role_without_family_is_not_admin() {
        let context = AuthContext {
            subject_id: Uuid::new_v4(),
            principal: Principal::Account,
            family_id: None,
            role: Some(CaretakerRole::Admin),
        };
        assert!(!context.is_admin());
    }

    #[test]
    fn test_authenticate_headers() {
        let claims = Claims::sys_admin(TokenType::Access);
        let token = create_token(&claims, SECRET).unwrap();

        let context = authenticate_headers(&headers_with(&format!("Bearer {}", token)), SECRET)
            .expect("valid token");
        assert!(context.is_sys_admin());
    }

    #[test]
    fn test_missing_and_malformed_headers() {
        assert!(matches!(
            authenticate_headers(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate_headers(&headers_with("Basic abc"), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            authenticate_headers(&headers_with("Bearer "), SECRET),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_refresh_token_rejected() {
        let claims = Claims::sys_admin(TokenType::Refresh);
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            authenticate_headers(&headers_with(&format!("Bearer {}", token)), SECRET),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
