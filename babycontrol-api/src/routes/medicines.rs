/// Per-family medicine catalogue
///
/// Medicine logs reference entries here. Deleting a medicine hides it from
/// the catalogue; existing logs keep pointing at it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use babycontrol_shared::{
    auth::{authorization::require_family, middleware::AuthContext},
    models::medicine::{CreateMedicine, Medicine, UpdateMedicine},
    units, validation,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(range(min = 0.0, message = "Dose must not be negative"))]
    pub typical_dose_size: Option<f64>,

    #[validate(custom(function = "validate_medicine_unit"))]
    pub unit_abbr: Option<String>,

    /// Minimum `HH:MM` between doses
    #[validate(custom(function = "validation::validate_hh_mm"))]
    pub dose_min_time: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMedicineRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 0.0, message = "Dose must not be negative"))]
    pub typical_dose_size: Option<f64>,

    #[validate(custom(function = "validate_medicine_unit"))]
    pub unit_abbr: Option<String>,

    #[validate(custom(function = "validation::validate_hh_mm"))]
    pub dose_min_time: Option<String>,

    pub notes: Option<String>,

    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMedicinesQuery {
    #[serde(default)]
    pub active_only: bool,
}

pub(crate) fn validate_medicine_unit(abbr: &str) -> Result<(), ValidationError> {
    if units::applies_to(abbr, "medicine") {
        return Ok(());
    }
    let mut err = ValidationError::new("unit");
    err.message = Some(format!("'{}' is not a medicine unit", abbr).into());
    Err(err)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListMedicinesQuery>,
) -> ApiResult<Json<Vec<Medicine>>> {
    let family_id = require_family(&auth)?;

    Ok(Json(
        Medicine::list_by_family(&state.db, family_id, query.active_only).await?,
    ))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Medicine>> {
    let family_id = require_family(&auth)?;

    let medicine = Medicine::find_by_id(&state.db, family_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Medicine not found".to_string()))?;

    Ok(Json(medicine))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateMedicineRequest>,
) -> ApiResult<(StatusCode, Json<Medicine>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let medicine = Medicine::create(
        &state.db,
        CreateMedicine {
            family_id,
            name: req.name,
            typical_dose_size: req.typical_dose_size,
            unit_abbr: req.unit_abbr,
            dose_min_time: req.dose_min_time,
            notes: req.notes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(medicine)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMedicineRequest>,
) -> ApiResult<Json<Medicine>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let medicine = Medicine::update(
        &state.db,
        family_id,
        id,
        UpdateMedicine {
            name: req.name,
            typical_dose_size: req.typical_dose_size,
            unit_abbr: req.unit_abbr,
            dose_min_time: req.dose_min_time,
            notes: req.notes,
            active: req.active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Medicine not found".to_string()))?;

    Ok(Json(medicine))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let family_id = require_family(&auth)?;

    if !Medicine::soft_delete(&state.db, family_id, id).await? {
        return Err(ApiError::NotFound("Medicine not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medicine_unit() {
        assert!(validate_medicine_unit("MG").is_ok());
        assert!(validate_medicine_unit("ml").is_ok());
        assert!(validate_medicine_unit("KG").is_err());
    }
}
