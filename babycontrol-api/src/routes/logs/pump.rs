/// Pump log create/update
///
/// `total_amount` defaults to left plus right when not given.

use super::{check_range, check_unit, load_current, not_found};
use crate::{app::AppState, error::ApiResult};
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
    models::pump_log::{PumpLog, PumpLogInput, PumpLogPatch},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePumpLogRequest {
    pub baby_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub left_amount: Option<f64>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub right_amount: Option<f64>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub total_amount: Option<f64>,

    pub unit_abbr: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePumpLogRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub left_amount: Option<f64>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub right_amount: Option<f64>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub total_amount: Option<f64>,

    pub unit_abbr: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

fn check_pump(input: &PumpLogInput) -> ApiResult<()> {
    check_range("end_time", input.start_time, input.end_time)?;
    check_unit("unit_abbr", input.unit_abbr.as_deref(), "pump")
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePumpLogRequest>,
) -> ApiResult<(StatusCode, Json<PumpLog>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let input = PumpLogInput {
        baby_id: req.baby_id,
        start_time: req.start_time,
        end_time: req.end_time,
        left_amount: req.left_amount,
        right_amount: req.right_amount,
        total_amount: req.total_amount,
        unit_abbr: req.unit_abbr,
        notes: req.notes,
    };
    check_pump(&input)?;
    require_baby_in_family(&state.db, family_id, input.baby_id).await?;

    let log = PumpLog::create(&state.db, family_id, auth.caretaker_id(), input).await?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePumpLogRequest>,
) -> ApiResult<Json<PumpLog>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: PumpLog = load_current(&state, family_id, id).await?;
    let input = PumpLogPatch {
        start_time: req.start_time,
        end_time: req.end_time,
        left_amount: req.left_amount,
        right_amount: req.right_amount,
        total_amount: req.total_amount,
        unit_abbr: req.unit_abbr,
        notes: req.notes,
    }
    .apply(&current);
    check_pump(&input)?;

    let log = PumpLog::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<PumpLog>)?;

    Ok(Json(log))
}
