/// Diaper log create/update

use super::{load_current, not_found};
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
    models::diaper_log::{DiaperLog, DiaperLogInput, DiaperLogPatch, DiaperType},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiaperLogRequest {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,
    pub diaper_type: DiaperType,

    #[validate(length(max = 50, message = "Condition must be at most 50 characters"))]
    pub condition: Option<String>,

    #[validate(length(max = 50, message = "Color must be at most 50 characters"))]
    pub color: Option<String>,

    #[serde(default)]
    pub blowout: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDiaperLogRequest {
    pub time: Option<DateTime<Utc>>,
    pub diaper_type: Option<DiaperType>,

    #[validate(length(max = 50, message = "Condition must be at most 50 characters"))]
    pub condition: Option<String>,

    #[validate(length(max = 50, message = "Color must be at most 50 characters"))]
    pub color: Option<String>,

    pub blowout: Option<bool>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDiaperLogRequest>,
) -> ApiResult<(StatusCode, Json<DiaperLog>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;
    require_baby_in_family(&state.db, family_id, req.baby_id).await?;

    let log = DiaperLog::create(
        &state.db,
        family_id,
        auth.caretaker_id(),
        DiaperLogInput {
            baby_id: req.baby_id,
            time: req.time,
            diaper_type: req.diaper_type,
            condition: req.condition,
            color: req.color,
            blowout: req.blowout,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDiaperLogRequest>,
) -> ApiResult<Json<DiaperLog>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: DiaperLog = load_current(&state, family_id, id).await?;
    let input = DiaperLogPatch {
        time: req.time,
        diaper_type: req.diaper_type,
        condition: req.condition,
        color: req.color,
        blowout: req.blowout,
    }
    .apply(&current);

    let log = DiaperLog::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<DiaperLog>)?;

    Ok(Json(log))
}
