/// Medicine log create/update
///
/// A dose must reference an active medicine from the caller's family. When
/// no unit is given the medicine's own unit is used.

use super::{check_unit, load_current, not_found};
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
        authorization::{require_baby_in_family, require_family},
        middleware::AuthContext,
    },
    models::{
        medicine::Medicine,
        medicine_log::{MedicineLog, MedicineLogInput, MedicineLogPatch},
    },
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineLogRequest {
    pub baby_id: Uuid,
    pub medicine_id: Uuid,
    pub time: DateTime<Utc>,

    #[validate(range(min = 0.0, message = "Dose must not be negative"))]
    pub dose_amount: f64,

    pub unit_abbr: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMedicineLogRequest {
    pub medicine_id: Option<Uuid>,
    pub time: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, message = "Dose must not be negative"))]
    pub dose_amount: Option<f64>,

    pub unit_abbr: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

async fn load_medicine(state: &AppState, family_id: Uuid, id: Uuid) -> ApiResult<Medicine> {
    let medicine = Medicine::find_by_id(&state.db, family_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Medicine not found".to_string()))?;

    if !medicine.active {
        return Err(ApiError::invalid_field("medicine_id", "Medicine is not active"));
    }

    Ok(medicine)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateMedicineLogRequest>,
) -> ApiResult<(StatusCode, Json<MedicineLog>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;
    require_baby_in_family(&state.db, family_id, req.baby_id).await?;

    let medicine = load_medicine(&state, family_id, req.medicine_id).await?;
    let unit_abbr = req.unit_abbr.or(medicine.unit_abbr);
    check_unit("unit_abbr", unit_abbr.as_deref(), "medicine")?;

    let log = MedicineLog::create(
        &state.db,
        family_id,
        auth.caretaker_id(),
        MedicineLogInput {
            baby_id: req.baby_id,
            medicine_id: medicine.id,
            time: req.time,
            dose_amount: req.dose_amount,
            unit_abbr,
            notes: req.notes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMedicineLogRequest>,
) -> ApiResult<Json<MedicineLog>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: MedicineLog = load_current(&state, family_id, id).await?;

    if let Some(medicine_id) = req.medicine_id {
        load_medicine(&state, family_id, medicine_id).await?;
    }

    let input = MedicineLogPatch {
        medicine_id: req.medicine_id,
        time: req.time,
        dose_amount: req.dose_amount,
        unit_abbr: req.unit_abbr,
        notes: req.notes,
    }
    .apply(&current);
    check_unit("unit_abbr", input.unit_abbr.as_deref(), "medicine")?;

    let log = MedicineLog::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<MedicineLog>)?;

    Ok(Json(log))
}
