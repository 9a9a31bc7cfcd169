/// Account endpoints (SaaS deployments only)
///
/// Account holders sign up with email and password, get a trial, and create
/// the one family their account owns. Billing state is maintained by the
/// Stripe webhook; these routes only report it.
///
/// # Endpoints
///
/// - `POST /v1/accounts/register` - Create an account
/// - `POST /v1/accounts/login` - Email/password login
/// - `GET /v1/accounts/verify?token=` - Confirm the email address
/// - `POST /v1/accounts/password-reset` - Email a reset link
/// - `POST /v1/accounts/password-reset/confirm` - Set a new password
/// - `GET /v1/accounts/me` - Account and access status
/// - `POST /v1/accounts/family` - Create the account's family
/// - `POST /v1/accounts/close` - Close the account

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use babycontrol_shared::{
    auth::{
        authorization::require_account,
        jwt::{self, Claims, Principal, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        account::{AccessStatus, Account, CreateAccount},
        caretaker::CaretakerRole,
        family::{CreateFamily, Family},
        family_setup_invite::generate_token,
        settings::{CreateSettings, Settings},
    },
    validation,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Reset links stay valid for one hour
const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength separately
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(max = 100, message = "Last name must be at most 100 characters"))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AccountLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFamilyRequest {
    #[validate(custom(function = "validation::validate_slug"))]
    pub slug: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "validation::validate_pin"))]
    pub security_pin: String,
}

/// Account with its computed access status
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub account: Account,

    pub access: AccessStatus,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        let access = account.access_status(Utc::now());
        Self { account, access }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountAuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,

    pub account: AccountResponse,
}

#[derive(Debug, Serialize)]
pub struct AccountFamilyResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,

    pub family: Family,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn account_claims(account_id: Uuid, family_id: Option<Uuid>) -> Claims {
    Claims::new(
        account_id,
        Principal::Account,
        family_id,
        Some(CaretakerRole::Admin),
        TokenType::Access,
    )
}

fn check_password_strength(password: &str) -> Result<(), ApiError> {
    password::validate_password_strength(password)
        .map_err(|message| ApiError::invalid_field("password", message))
}

/// Register a new account
///
/// Starts a trial of `TRIAL_DAYS` days and sends a verification email.
///
/// # Endpoint
///
/// ```text
/// POST /v1/accounts/register
/// Content-Type: application/json
///
/// {
///   "email": "parent@example.com",
///   "password": "SecureP@ss123",
///   "first_name": "Sam"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed or weak password
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AccountAuthResponse>)> {
    req.validate()?;
    check_password_strength(&req.password)?;

    let verification_token = generate_token();

    let account = Account::create(
        &state.db,
        CreateAccount {
            email: req.email,
            password_hash: password::hash_password(&req.password)?,
            first_name: req.first_name,
            last_name: req.last_name,
            verification_token: verification_token.clone(),
            trial_ends: Utc::now() + Duration::days(state.config.deployment.trial_days),
        },
    )
    .await?;

    info!(account_id = %account.id, "Account registered");

    if let Err(e) = state
        .email
        .send_verification_email(
            &state.db,
            &account.email,
            Some(&account.first_name),
            &verification_token,
        )
        .await
    {
        warn!(account_id = %account.id, error = %e, "Failed to send verification email");
    }

    let tokens = jwt::issue_token_pair(&account_claims(account.id, None), state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(AccountAuthResponse {
            tokens,
            account: account.into(),
        }),
    ))
}

/// Account login
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `403 Forbidden`: Account is closed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<AccountLoginRequest>,
) -> ApiResult<Json<AccountAuthResponse>> {
    req.validate()?;

    let account = Account::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !password::verify_password(&req.password, &account.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
    }

    if account.closed {
        return Err(ApiError::Forbidden("This account has been closed".to_string()));
    }

    let tokens = jwt::issue_token_pair(
        &account_claims(account.id, account.family_id),
        state.jwt_secret(),
    )?;

    Ok(Json(AccountAuthResponse {
        tokens,
        account: account.into(),
    }))
}

/// Confirms an email address from the link in the verification email
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let account = Account::find_by_verification_token(&state.db, &query.token)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("Invalid or already used verification token".to_string())
        })?;

    Account::mark_verified(&state.db, account.id).await?;
    info!(account_id = %account.id, "Account email verified");

    Ok(Json(serde_json::json!({ "verified": true })))
}

/// Emails a password reset link
///
/// Always answers 200 so the endpoint cannot reveal which emails have accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    if let Some(account) = Account::find_by_email(&state.db, &req.email).await? {
        if !account.closed {
            let token = generate_token();
            let expires = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
            Account::set_password_reset(&state.db, account.id, &token, expires).await?;

            if let Err(e) = state
                .email
                .send_password_reset_email(
                    &state.db,
                    &account.email,
                    Some(&account.first_name),
                    &token,
                )
                .await
            {
                warn!(account_id = %account.id, error = %e, "Failed to send password reset email");
            }
        }
    }

    Ok(Json(MessageResponse {
        message: "If that email is registered, a reset link is on its way",
    }))
}

/// Sets a new password using a reset token
///
/// # Errors
///
/// - `400 Bad Request`: Token unknown or expired
/// - `422 Unprocessable Entity`: Weak password
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> ApiResult<Json<MessageResponse>> {
    check_password_strength(&req.password)?;

    let account = Account::find_by_reset_token(&state.db, &req.token)
        .await?
        .filter(|account| account.reset_token_valid(Utc::now()))
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset token".to_string()))?;

    let hash = password::hash_password(&req.password)?;
    Account::update_password(&state.db, account.id, &hash).await?;

    info!(account_id = %account.id, "Password reset completed");

    Ok(Json(MessageResponse {
        message: "Password updated",
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AccountResponse>> {
    let account_id = require_account(&auth)?;

    let account = Account::find_by_id(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    Ok(Json(account.into()))
}

/// Creates the family owned by this account
///
/// The family, its settings and the account link are written in one
/// transaction. The response carries fresh tokens bound to the new family.
///
/// # Errors
///
/// - `409 Conflict`: Account already has a family, or slug taken
pub async fn create_family(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateFamilyRequest>,
) -> ApiResult<(StatusCode, Json<AccountFamilyResponse>)> {
    let account_id = require_account(&auth)?;
    req.validate()?;

    let account = Account::find_by_id(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    if account.closed {
        return Err(ApiError::Forbidden("This account has been closed".to_string()));
    }
    if account.family_id.is_some() {
        return Err(ApiError::Conflict("This account already has a family".to_string()));
    }

    let pin_hash = password::hash_password(&req.security_pin)?;

    let mut tx = state.db.begin().await?;

    let family = Family::create(
        &mut *tx,
        CreateFamily {
            slug: req.slug,
            name: req.name.clone(),
            account_id: Some(account.id),
        },
    )
    .await?;

    Settings::create(
        &mut *tx,
        CreateSettings {
            family_id: family.id,
            family_name: req.name,
            security_pin_hash: pin_hash,
        },
    )
    .await?;

    Account::set_family(&mut *tx, account.id, family.id).await?;

    tx.commit().await?;

    info!(account_id = %account.id, family_id = %family.id, "Account family created");

    let claims = account_claims(account.id, Some(family.id));
    let tokens = jwt::issue_token_pair(&claims, state.jwt_secret())?;

    Ok((StatusCode::CREATED, Json(AccountFamilyResponse { tokens, family })))
}

/// Closes the account; its family becomes read-only
pub async fn close(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AccountResponse>> {
    let account_id = require_account(&auth)?;

    let account = Account::close(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::Conflict("Account is already closed".to_string()))?;

    info!(account_id = %account.id, "Account closed");

    Ok(Json(account.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "whatever".to_string(),
            first_name: String::new(),
            last_name: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("first_name"));
    }

    #[test]
    fn test_create_family_request_validation() {
        let req = CreateFamilyRequest {
            slug: "Bad Slug".to_string(),
            name: "Smith Family".to_string(),
            security_pin: "12ab".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("slug"));
        assert!(errors.field_errors().contains_key("security_pin"));
    }

    #[test]
    fn test_account_claims_are_family_admin() {
        let account_id = Uuid::new_v4();
        let family_id = Uuid::new_v4();
        let claims = account_claims(account_id, Some(family_id));

        assert_eq!(claims.principal, Principal::Account);
        assert_eq!(claims.family_id, Some(family_id));
        assert_eq!(claims.role, Some(CaretakerRole::Admin));
    }
}
