/// Family setup invitations
///
/// The system administrator issues one-time tokens; redeeming a token
/// creates a family together with its settings and logs the new family in
/// with the family PIN.
///
/// # Endpoints
///
/// - `POST /v1/family-setup/invites` - Create an invite (system admin)
/// - `GET /v1/family-setup/invites` - List invites (system admin)
/// - `GET /v1/family-setup/invites/:token` - Check an invite (public)
/// - `POST /v1/family-setup/complete` - Redeem an invite (public)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use babycontrol_shared::{
    auth::{
        authorization::require_sys_admin,
        jwt::{self, Claims, Principal, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        caretaker::CaretakerRole,
        family::{CreateFamily, Family},
        family_setup_invite::FamilySetupInvite,
        settings::{CreateSettings, Settings},
    },
    validation,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateInviteRequest {
    /// Deliver the invite link to this address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateInviteResponse {
    #[serde(flatten)]
    pub invite: FamilySetupInvite,

    pub email_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct InviteStatusResponse {
    pub valid: bool,
    pub expires_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteSetupRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(custom(function = "validation::validate_slug"))]
    pub slug: String,

    #[validate(custom(function = "validation::validate_pin"))]
    pub security_pin: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteSetupResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,

    pub family: Family,
}

fn invite_problem(invite: &FamilySetupInvite, now: DateTime<Utc>) -> Option<&'static str> {
    if invite.used {
        Some("This invite has already been used")
    } else if invite.expires_at <= now {
        Some("This invite has expired")
    } else {
        None
    }
}

pub async fn create_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<CreateInviteResponse>)> {
    require_sys_admin(&auth)?;
    req.validate()?;

    let invite = FamilySetupInvite::create(&state.db, "sysadmin").await?;
    info!(invite_id = %invite.id, expires_at = %invite.expires_at, "Family setup invite created");

    let mut email_sent = false;
    if let Some(email) = req.email.as_deref() {
        match state.email.send_invite_email(&state.db, email, &invite.token).await {
            Ok(()) => email_sent = true,
            Err(e) => warn!(invite_id = %invite.id, error = %e, "Failed to send invite email"),
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse { invite, email_sent }),
    ))
}

pub async fn list_invites(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<FamilySetupInvite>>> {
    require_sys_admin(&auth)?;

    Ok(Json(FamilySetupInvite::list(&state.db).await?))
}

/// Reports whether an invite can still be redeemed
///
/// # Errors
///
/// - `404 Not Found`: Unknown token
pub async fn check_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<InviteStatusResponse>> {
    let invite = FamilySetupInvite::find_by_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invite not found".to_string()))?;

    let reason = invite_problem(&invite, Utc::now());

    Ok(Json(InviteStatusResponse {
        valid: reason.is_none(),
        expires_at: invite.expires_at,
        reason,
    }))
}

/// Redeems an invite
///
/// Family, settings and the used-flag on the invite are written in one
/// transaction, so a token can create at most one family.
///
/// # Endpoint
///
/// ```text
/// POST /v1/family-setup/complete
/// Content-Type: application/json
///
/// {
///   "token": "9f86d08...",
///   "name": "Smith Family",
///   "slug": "smith-family",
///   "security_pin": "123456"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invite expired
/// - `404 Not Found`: Unknown token
/// - `409 Conflict`: Invite already used, or slug taken
pub async fn complete(
    State(state): State<AppState>,
    Json(req): Json<CompleteSetupRequest>,
) -> ApiResult<(StatusCode, Json<CompleteSetupResponse>)> {
    req.validate()?;

    let pin_hash = password::hash_password(&req.security_pin)?;

    let mut tx = state.db.begin().await?;

    let invite = FamilySetupInvite::find_by_token(&mut *tx, &req.token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invite not found".to_string()))?;

    match invite_problem(&invite, Utc::now()) {
        Some(reason) if invite.used => return Err(ApiError::Conflict(reason.to_string())),
        Some(reason) => return Err(ApiError::BadRequest(reason.to_string())),
        None => {}
    }

    let family = Family::create(
        &mut *tx,
        CreateFamily {
            slug: req.slug,
            name: req.name.clone(),
            account_id: None,
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

    // Lost a race with another redemption of the same token
    if !FamilySetupInvite::mark_used(&mut *tx, invite.id, family.id).await? {
        return Err(ApiError::Conflict("This invite has already been used".to_string()));
    }

    tx.commit().await?;

    info!(invite_id = %invite.id, family_id = %family.id, "Family created from invite");

    let claims = Claims::new(
        family.id,
        Principal::FamilySystem,
        Some(family.id),
        Some(CaretakerRole::Admin),
        TokenType::Access,
    );
    let tokens = jwt::issue_token_pair(&claims, state.jwt_secret())?;

    Ok((StatusCode::CREATED, Json(CompleteSetupResponse { tokens, family })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn invite(used: bool, expires_in: Duration) -> FamilySetupInvite {
        let now = Utc::now();
        FamilySetupInvite {
            id: Uuid::new_v4(),
            token: "token".to_string(),
            expires_at: now + expires_in,
            used,
            family_id: None,
            created_by: Some("sysadmin".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_invite_problem() {
        let now = Utc::now();
        assert_eq!(invite_problem(&invite(false, Duration::days(1)), now), None);
        assert_eq!(
            invite_problem(&invite(true, Duration::days(1)), now),
            Some("This invite has already been used")
        );
        assert_eq!(
            invite_problem(&invite(false, Duration::days(-1)), now),
            Some("This invite has expired")
        );
    }
}
