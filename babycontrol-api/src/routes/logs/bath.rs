/// Bath log create/update

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
    models::bath_log::{BathLog, BathLogInput, BathLogPatch},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBathLogRequest {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,

    #[serde(default)]
    pub soap_used: bool,

    #[serde(default)]
    pub shampoo_used: bool,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBathLogRequest {
    pub time: Option<DateTime<Utc>>,
    pub soap_used: Option<bool>,
    pub shampoo_used: Option<bool>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBathLogRequest>,
) -> ApiResult<(StatusCode, Json<BathLog>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;
    require_baby_in_family(&state.db, family_id, req.baby_id).await?;

    let log = BathLog::create(
        &state.db,
        family_id,
        auth.caretaker_id(),
        BathLogInput {
            baby_id: req.baby_id,
            time: req.time,
            soap_used: req.soap_used,
            shampoo_used: req.shampoo_used,
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
    Json(req): Json<UpdateBathLogRequest>,
) -> ApiResult<Json<BathLog>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: BathLog = load_current(&state, family_id, id).await?;
    let input = BathLogPatch {
        time: req.time,
        soap_used: req.soap_used,
        shampoo_used: req.shampoo_used,
        notes: req.notes,
    }
    .apply(&current);

    let log = BathLog::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<BathLog>)?;

    Ok(Json(log))
}
