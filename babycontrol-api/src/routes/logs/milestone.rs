/// Milestone create/update

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
    models::milestone::{Milestone, MilestoneCategory, MilestoneInput, MilestonePatch},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMilestoneRequest {
    pub baby_id: Uuid,
    pub date: DateTime<Utc>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub category: MilestoneCategory,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMilestoneRequest {
    pub date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub category: Option<MilestoneCategory>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateMilestoneRequest>,
) -> ApiResult<(StatusCode, Json<Milestone>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;
    require_baby_in_family(&state.db, family_id, req.baby_id).await?;

    let milestone = Milestone::create(
        &state.db,
        family_id,
        auth.caretaker_id(),
        MilestoneInput {
            baby_id: req.baby_id,
            date: req.date,
            title: req.title,
            description: req.description,
            category: req.category,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(milestone)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMilestoneRequest>,
) -> ApiResult<Json<Milestone>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: Milestone = load_current(&state, family_id, id).await?;
    let input = MilestonePatch {
        date: req.date,
        title: req.title,
        description: req.description,
        category: req.category,
    }
    .apply(&current);

    let milestone = Milestone::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<Milestone>)?;

    Ok(Json(milestone))
}
