/// Sleep log create/update
///
/// Leave `end_time` out to start a sleep that is still going; set it later
/// with an update.

use super::{check_range, load_current, not_found};
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
    models::sleep_log::{SleepLog, SleepLogInput, SleepLogPatch, SleepType},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSleepLogRequest {
    pub baby_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub sleep_type: SleepType,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 50, message = "Quality must be at most 50 characters"))]
    pub quality: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSleepLogRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub sleep_type: Option<SleepType>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 50, message = "Quality must be at most 50 characters"))]
    pub quality: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSleepLogRequest>,
) -> ApiResult<(StatusCode, Json<SleepLog>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;
    check_range("end_time", req.start_time, req.end_time)?;
    require_baby_in_family(&state.db, family_id, req.baby_id).await?;

    let log = SleepLog::create(
        &state.db,
        family_id,
        auth.caretaker_id(),
        SleepLogInput {
            baby_id: req.baby_id,
            start_time: req.start_time,
            end_time: req.end_time,
            sleep_type: req.sleep_type,
            location: req.location,
            quality: req.quality,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSleepLogRequest>,
) -> ApiResult<Json<SleepLog>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: SleepLog = load_current(&state, family_id, id).await?;
    let input = SleepLogPatch {
        start_time: req.start_time,
        end_time: req.end_time,
        sleep_type: req.sleep_type,
        location: req.location,
        quality: req.quality,
    }
    .apply(&current);
    check_range("end_time", input.start_time, input.end_time)?;

    let log = SleepLog::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<SleepLog>)?;

    Ok(Json(log))
}
