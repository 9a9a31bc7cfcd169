/// Caretaker management
///
/// Any family member can list and read caretakers; only family admins can
/// create, change or remove them. The first caretaker of a family is always
/// an admin, and a family always keeps at least one active admin.

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
        authorization::{require_admin, require_family},
        middleware::AuthContext,
        password,
    },
    models::caretaker::{Caretaker, CaretakerRole, CreateCaretaker, UpdateCaretaker},
    validation,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCaretakerRequest {
    #[validate(custom(function = "validation::validate_login_id"))]
    pub login_id: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "Type must be at most 50 characters"))]
    pub caretaker_type: Option<String>,

    #[serde(default = "default_role")]
    pub role: CaretakerRole,

    #[validate(custom(function = "validation::validate_pin"))]
    pub security_pin: String,
}

fn default_role() -> CaretakerRole {
    CaretakerRole::User
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCaretakerRequest {
    #[validate(custom(function = "validation::validate_login_id"))]
    pub login_id: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 50, message = "Type must be at most 50 characters"))]
    pub caretaker_type: Option<String>,

    pub role: Option<CaretakerRole>,

    #[validate(custom(function = "validation::validate_pin"))]
    pub security_pin: Option<String>,

    pub inactive: Option<bool>,
}

const LAST_ADMIN: &str = "The family must keep at least one active admin";

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Caretaker>>> {
    let family_id = require_family(&auth)?;

    Ok(Json(Caretaker::list_by_family(&state.db, family_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Caretaker>> {
    let family_id = require_family(&auth)?;

    let caretaker = Caretaker::find_by_id(&state.db, family_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Caretaker not found".to_string()))?;

    Ok(Json(caretaker))
}

/// Role for a new caretaker
///
/// A family without an active admin caretaker gets one: family-PIN login
/// stops working once a caretaker exists, so someone must be able to manage
/// the family afterwards.
fn initial_role(requested: CaretakerRole, active_admins: i64) -> CaretakerRole {
    if active_admins == 0 {
        CaretakerRole::Admin
    } else {
        requested
    }
}

/// Adds a caretaker
///
/// The first caretaker is created as an admin whatever role was requested.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a family admin
/// - `409 Conflict`: Login ID already used in this family
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCaretakerRequest>,
) -> ApiResult<(StatusCode, Json<Caretaker>)> {
    let family_id = require_admin(&auth)?;
    req.validate()?;

    let active_admins = Caretaker::count_active_admins(&state.db, family_id).await?;

    let caretaker = Caretaker::create(
        &state.db,
        CreateCaretaker {
            family_id,
            login_id: req.login_id,
            name: req.name,
            caretaker_type: req.caretaker_type,
            role: initial_role(req.role, active_admins),
            security_pin_hash: password::hash_password(&req.security_pin)?,
        },
    )
    .await?;

    info!(
        family_id = %family_id,
        caretaker_id = %caretaker.id,
        role = caretaker.role.as_str(),
        "Caretaker created"
    );

    Ok((StatusCode::CREATED, Json(caretaker)))
}

/// Updates a caretaker
///
/// # Errors
///
/// - `404 Not Found`: No such caretaker in this family
/// - `409 Conflict`: Login ID taken, or this would remove the last active admin
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCaretakerRequest>,
) -> ApiResult<Json<Caretaker>> {
    let family_id = require_admin(&auth)?;
    req.validate()?;

    let current = Caretaker::find_by_id(&state.db, family_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Caretaker not found".to_string()))?;

    let security_pin_hash = req
        .security_pin
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let data = UpdateCaretaker {
        login_id: req.login_id,
        name: req.name,
        caretaker_type: req.caretaker_type,
        role: req.role,
        security_pin_hash,
        inactive: req.inactive,
    };

    if data.removes_admin(&current)
        && Caretaker::count_active_admins(&state.db, family_id).await? <= 1
    {
        return Err(ApiError::Conflict(LAST_ADMIN.to_string()));
    }

    let caretaker = Caretaker::update(&state.db, family_id, id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Caretaker not found".to_string()))?;

    Ok(Json(caretaker))
}

/// Soft-deletes a caretaker
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let family_id = require_admin(&auth)?;

    let current = Caretaker::find_by_id(&state.db, family_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Caretaker not found".to_string()))?;

    if current.is_active_admin()
        && Caretaker::count_active_admins(&state.db, family_id).await? <= 1
    {
        return Err(ApiError::Conflict(LAST_ADMIN.to_string()));
    }

    if !Caretaker::soft_delete(&state.db, family_id, id).await? {
        return Err(ApiError::NotFound("Caretaker not found".to_string()));
    }

    info!(family_id = %family_id, caretaker_id = %id, "Caretaker deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_defaults_to_user() {
        let req: CreateCaretakerRequest = serde_json::from_value(serde_json::json!({
            "login_id": "02",
            "name": "Grandma",
            "security_pin": "4321"
        }))
        .unwrap();

        assert_eq!(req.role, CaretakerRole::User);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_first_caretaker_is_admin() {
        assert_eq!(initial_role(CaretakerRole::User, 0), CaretakerRole::Admin);
        assert_eq!(initial_role(CaretakerRole::User, 1), CaretakerRole::User);
        assert_eq!(initial_role(CaretakerRole::Admin, 2), CaretakerRole::Admin);
    }

    #[test]
    fn test_login_id_rules() {
        for bad in ["00", "1", "ab", "123"] {
            let req = UpdateCaretakerRequest {
                login_id: Some(bad.to_string()),
                name: None,
                caretaker_type: None,
                role: None,
                security_pin: None,
                inactive: None,
            };
            assert!(req.validate().is_err(), "{} should be rejected", bad);
        }
    }
}
