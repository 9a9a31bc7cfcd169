/// Family endpoints
///
/// # Endpoints
///
/// - `GET /v1/families/slug-check/:slug` - Slug validity and availability (public)
/// - `GET /v1/families/by-slug/:slug` - Public family summary for the login page
/// - `GET /v1/family` - The caller's family
/// - `PUT /v1/family` - Rename or re-slug the caller's family (family admin)
/// - `GET /v1/families` - List all families (system admin)
/// - `PUT /v1/families/:id` - Activate, deactivate or rename (system admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use babycontrol_shared::{
    auth::{
        authorization::{require_admin, require_family, require_sys_admin},
        middleware::AuthContext,
    },
    models::{
        family::{Family, FamilySummary, UpdateFamily},
        settings::{Settings, UpdateSettings},
    },
    validation,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct SlugCheckResponse {
    pub slug: String,
    pub valid: bool,
    pub available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFamilyRequest {
    #[validate(custom(function = "validation::validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateFamilyRequest {
    #[validate(custom(function = "validation::validate_slug"))]
    pub slug: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListFamiliesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListFamiliesResponse {
    pub families: Vec<Family>,
    pub total: i64,
}

/// Checks a slug before family creation
///
/// # Response
///
/// ```json
/// { "slug": "admin", "valid": false, "available": false, "reason": "This slug is reserved" }
/// ```
pub async fn slug_check(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<SlugCheckResponse>> {
    if let Some(reason) = validation::slug_problem(&slug) {
        return Ok(Json(SlugCheckResponse {
            slug,
            valid: false,
            available: false,
            reason: Some(reason),
        }));
    }

    let taken = Family::slug_exists(&state.db, &slug).await?;

    Ok(Json(SlugCheckResponse {
        slug,
        valid: true,
        available: !taken,
        reason: taken.then_some("This slug is already taken"),
    }))
}

pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<FamilySummary>> {
    let family = Family::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Family not found".to_string()))?;

    Ok(Json(FamilySummary::from(&family)))
}

pub async fn get_current(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Family>> {
    let family_id = require_family(&auth)?;

    let family = Family::find_by_id(&state.db, family_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Family not found".to_string()))?;

    Ok(Json(family))
}

/// Updates the caller's family
///
/// A new name is mirrored into the family settings.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a family admin
/// - `409 Conflict`: Slug already taken
pub async fn update_current(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateFamilyRequest>,
) -> ApiResult<Json<Family>> {
    let family_id = require_admin(&auth)?;
    req.validate()?;

    let family = apply_update(
        &state,
        family_id,
        UpdateFamily {
            slug: req.slug,
            name: req.name,
            is_active: None,
        },
    )
    .await?;

    Ok(Json(family))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListFamiliesQuery>,
) -> ApiResult<Json<ListFamiliesResponse>> {
    require_sys_admin(&auth)?;

    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let families = Family::list(&state.db, limit, offset).await?;
    let total = Family::count(&state.db).await?;

    Ok(Json(ListFamiliesResponse { families, total }))
}

/// System administrator update; deactivated families can no longer log in
pub async fn update_by_id(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdminUpdateFamilyRequest>,
) -> ApiResult<Json<Family>> {
    require_sys_admin(&auth)?;
    req.validate()?;

    let family = apply_update(
        &state,
        id,
        UpdateFamily {
            slug: req.slug,
            name: req.name,
            is_active: req.is_active,
        },
    )
    .await?;

    Ok(Json(family))
}

async fn apply_update(state: &AppState, family_id: Uuid, data: UpdateFamily) -> ApiResult<Family> {
    if data.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let new_name = data.name.clone();

    let family = Family::update(&state.db, family_id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Family not found".to_string()))?;

    if let Some(name) = new_name {
        Settings::update(
            &state.db,
            family_id,
            UpdateSettings {
                family_name: Some(name),
                ..Default::default()
            },
        )
        .await?;
    }

    info!(family_id = %family.id, is_active = family.is_active, "Family updated");

    Ok(family)
}
