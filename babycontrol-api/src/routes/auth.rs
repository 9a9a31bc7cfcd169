/// Authentication endpoints
///
/// This module provides login for the three non-account identities:
/// - Caretakers (family slug + login ID + PIN)
/// - The family itself, before any caretaker exists (family slug + family PIN)
/// - The system administrator (instance password)
///
/// # Endpoints
///
/// - `POST /v1/auth/login` - Caretaker or family login
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `POST /v1/auth/admin` - System administrator login
/// - `GET /v1/auth/me` - Describe the current token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use babycontrol_shared::{
    auth::{
        jwt::{self, Claims, Principal, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        account::Account,
        app_config::AppConfig,
        caretaker::{Caretaker, CaretakerRole},
        family::{Family, FamilySummary},
        settings::Settings,
    },
    validation,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid login ID or security PIN";
const REVOKED: &str = "Refresh token is no longer valid";

/// Lockout key for the system administrator login
const ADMIN_LOCKOUT_KEY: &str = "admin";

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Family slug is required"))]
    pub family_slug: String,

    /// Two-digit caretaker login ID; omitted for a family-PIN login
    #[validate(custom(function = "validation::validate_login_id"))]
    pub login_id: Option<String>,

    #[validate(custom(function = "validation::validate_pin"))]
    pub security_pin: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,

    pub family: FamilySummary,

    /// The caretaker who logged in; absent for a family-PIN login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caretaker: Option<Caretaker>,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Lockout key for a family login
///
/// Keyed by what is being guessed (family plus login ID) rather than by
/// client address, so rotating request headers does not reset the count.
pub(crate) fn lockout_key(family_slug: &str, login_id: Option<&str>) -> String {
    format!(
        "{}|{}",
        family_slug.trim().to_lowercase(),
        login_id.unwrap_or("family")
    )
}

/// Records a failed attempt; the attempt that trips the limit answers 429
fn login_failure(state: &AppState, key: &str) -> ApiError {
    match state.lockout.record_failure(key) {
        Some(locked) => {
            warn!(lockout_key = %key, "Login locked after repeated failures");
            locked.into()
        }
        None => ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()),
    }
}

/// Login endpoint
///
/// Authenticates a caretaker by login ID and PIN. A family with no active
/// caretakers may instead log in with the family security PIN and no login
/// ID; that session acts as the family administrator.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "family_slug": "smith-family",
///   "login_id": "01",
///   "security_pin": "1234"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ...",
///   "token_type": "Bearer",
///   "expires_in": 86400,
///   "family": { "id": "uuid", "slug": "smith-family", "name": "Smith Family", "is_active": true },
///   "caretaker": { "id": "uuid", "login_id": "01", "name": "Sam", "role": "admin", ... }
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown family, login ID or wrong PIN
/// - `403 Forbidden`: Family or caretaker is inactive
/// - `422 Unprocessable Entity`: Validation failed, or login ID missing while
///   the family has caretakers
/// - `429 Too Many Requests`: Locked after 3 failures (see `Retry-After`)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let key = lockout_key(&req.family_slug, req.login_id.as_deref());
    state.lockout.check(&key)?;

    let family = match Family::find_by_slug(&state.db, &req.family_slug).await? {
        Some(family) => family,
        None => return Err(login_failure(&state, &key)),
    };

    if !family.is_active {
        return Err(ApiError::Forbidden("This family has been deactivated".to_string()));
    }

    let (claims, caretaker) = match req.login_id.as_deref() {
        Some(login_id) => {
            let found = Caretaker::find_by_login_id(&state.db, family.id, login_id).await?;
            let caretaker = match found {
                Some(caretaker) => caretaker,
                None => return Err(login_failure(&state, &key)),
            };

            if !password::verify_password(&req.security_pin, &caretaker.security_pin_hash)? {
                return Err(login_failure(&state, &key));
            }

            if caretaker.inactive {
                return Err(ApiError::Forbidden("This caretaker is inactive".to_string()));
            }

            let claims = Claims::new(
                caretaker.id,
                Principal::Caretaker,
                Some(family.id),
                Some(caretaker.role),
                TokenType::Access,
            );
            (claims, Some(caretaker))
        }
        None => {
            if Caretaker::count_active(&state.db, family.id).await? > 0 {
                return Err(ApiError::invalid_field("login_id", "Login ID is required"));
            }

            let settings = Settings::find_by_family(&state.db, family.id)
                .await?
                .ok_or_else(|| ApiError::InternalError("Family settings missing".to_string()))?;

            if !password::verify_password(&req.security_pin, &settings.security_pin_hash)? {
                return Err(login_failure(&state, &key));
            }

            let claims = Claims::new(
                family.id,
                Principal::FamilySystem,
                Some(family.id),
                Some(CaretakerRole::Admin),
                TokenType::Access,
            );
            (claims, None)
        }
    };

    state.lockout.record_success(&key);

    info!(
        family_id = %family.id,
        principal = claims.principal.as_str(),
        "Login succeeded"
    );

    Ok(Json(LoginResponse {
        tokens: jwt::issue_token_pair(&claims, state.jwt_secret())?,
        family: FamilySummary::from(&family),
        caretaker,
    }))
}

fn revoked() -> ApiError {
    ApiError::Unauthorized(REVOKED.to_string())
}

async fn active_family(state: &AppState, family_id: Option<Uuid>) -> ApiResult<Family> {
    let family = match family_id {
        Some(id) => Family::find_by_id(&state.db, id).await?,
        None => None,
    }
    .ok_or_else(revoked)?;

    if !family.is_active {
        return Err(ApiError::Forbidden("This family has been deactivated".to_string()));
    }

    Ok(family)
}

/// Rebuilds access claims for a refresh token from the stored identity
///
/// The role is read from the caretaker row, so a demotion or deactivation
/// takes effect at the next refresh.
async fn refreshed_claims(state: &AppState, refresh: &Claims) -> ApiResult<Claims> {
    let (family_id, role) = match refresh.principal {
        Principal::Caretaker => {
            let family = active_family(state, refresh.family_id).await?;
            let caretaker = Caretaker::find_by_id(&state.db, family.id, refresh.sub)
                .await?
                .ok_or_else(revoked)?;

            if caretaker.inactive {
                return Err(ApiError::Forbidden("This caretaker is inactive".to_string()));
            }
            (Some(family.id), Some(caretaker.role))
        }
        Principal::FamilySystem => {
            let family = active_family(state, Some(refresh.sub)).await?;

            // Family-PIN sessions end once caretakers exist
            if Caretaker::count_active(&state.db, family.id).await? > 0 {
                return Err(revoked());
            }
            (Some(family.id), Some(CaretakerRole::Admin))
        }
        Principal::Account => {
            let account = Account::find_by_id(&state.db, refresh.sub)
                .await?
                .ok_or_else(revoked)?;

            if account.closed {
                return Err(ApiError::Forbidden("This account has been closed".to_string()));
            }
            (account.family_id, Some(CaretakerRole::Admin))
        }
        Principal::SysAdmin => {
            AppConfig::get(&state.db).await?.ok_or_else(revoked)?;
            (None, None)
        }
    };

    Ok(Claims::new(
        refresh.sub,
        refresh.principal,
        family_id,
        role,
        TokenType::Access,
    ))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token. The identity behind
/// the token is reloaded first; family, role and active flags come from the
/// database, not from the refresh token.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
/// Content-Type: application/json
///
/// {
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "access_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or the identity
///   behind it no longer exists
/// - `403 Forbidden`: Caretaker, family or account is inactive or closed
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;
    let access = refreshed_claims(&state, &claims).await?;

    Ok(Json(RefreshResponse {
        access_token: jwt::create_token(&access, state.jwt_secret())?,
    }))
}

/// System administrator login
///
/// Checks the password against the hash stored in `app_config`.
///
/// # Errors
///
/// - `401 Unauthorized`: Wrong password, or no administrator configured
/// - `429 Too Many Requests`: Locked after 3 failures
pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    req.validate()?;

    let key = ADMIN_LOCKOUT_KEY;
    state.lockout.check(key)?;

    let config = match AppConfig::get(&state.db).await? {
        Some(config) => config,
        None => {
            warn!("System administrator login attempted before ADMIN_PASSWORD was set");
            return Err(login_failure(&state, key));
        }
    };

    if !password::verify_password(&req.password, &config.admin_pass_hash)? {
        return Err(login_failure(&state, key));
    }

    state.lockout.record_success(key);
    info!("System administrator logged in");

    let tokens = jwt::issue_token_pair(&Claims::sys_admin(TokenType::Access), state.jwt_secret())?;
    Ok(Json(tokens))
}

/// Returns the decoded identity of the bearer token
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<AuthContext> {
    Json(auth)
}
