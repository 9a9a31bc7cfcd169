/// Baby endpoints
///
/// # Endpoints
///
/// - `GET /v1/babies?include_inactive=` - List babies
/// - `POST /v1/babies` - Add a baby
/// - `GET/PUT/DELETE /v1/babies/:id` - Read, update, soft-delete
/// - `GET /v1/babies/:id/status` - Last feed/diaper/sleep and overdue warnings
/// - `GET /v1/babies/:id/timeline` - All activity, newest first

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
    activity::{
        status::{self, BabyStatus},
        timeline::{self, TimelineEntry},
    },
    auth::{authorization::require_family, middleware::AuthContext},
    models::baby::{Baby, CreateBaby, UpdateBaby},
    validation,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBabyRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    pub birth_date: NaiveDate,

    #[validate(length(max = 20, message = "Gender must be at most 20 characters"))]
    pub gender: Option<String>,

    /// `HH:MM` without a feed before the feed warning shows
    #[validate(custom(function = "validation::validate_hh_mm"))]
    pub feed_warning_time: Option<String>,

    #[validate(custom(function = "validation::validate_hh_mm"))]
    pub diaper_warning_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBabyRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    pub birth_date: Option<NaiveDate>,

    #[validate(length(max = 20, message = "Gender must be at most 20 characters"))]
    pub gender: Option<String>,

    pub inactive: Option<bool>,

    #[validate(custom(function = "validation::validate_hh_mm"))]
    pub feed_warning_time: Option<String>,

    #[validate(custom(function = "validation::validate_hh_mm"))]
    pub diaper_warning_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBabiesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

async fn load_baby(state: &AppState, family_id: Uuid, id: Uuid) -> ApiResult<Baby> {
    Baby::find_by_id(&state.db, family_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Baby not found".to_string()))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListBabiesQuery>,
) -> ApiResult<Json<Vec<Baby>>> {
    let family_id = require_family(&auth)?;

    Ok(Json(
        Baby::list_by_family(&state.db, family_id, query.include_inactive).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBabyRequest>,
) -> ApiResult<(StatusCode, Json<Baby>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let baby = Baby::create(
        &state.db,
        CreateBaby {
            family_id,
            first_name: req.first_name,
            last_name: req.last_name,
            birth_date: req.birth_date,
            gender: req.gender,
            feed_warning_time: req.feed_warning_time,
            diaper_warning_time: req.diaper_warning_time,
        },
    )
    .await?;

    info!(family_id = %family_id, baby_id = %baby.id, "Baby added");

    Ok((StatusCode::CREATED, Json(baby)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Baby>> {
    let family_id = require_family(&auth)?;

    Ok(Json(load_baby(&state, family_id, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBabyRequest>,
) -> ApiResult<Json<Baby>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let baby = Baby::update(
        &state.db,
        family_id,
        id,
        UpdateBaby {
            first_name: req.first_name,
            last_name: req.last_name,
            birth_date: req.birth_date,
            gender: req.gender,
            inactive: req.inactive,
            feed_warning_time: req.feed_warning_time,
            diaper_warning_time: req.diaper_warning_time,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Baby not found".to_string()))?;

    Ok(Json(baby))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let family_id = require_family(&auth)?;

    if !Baby::soft_delete(&state.db, family_id, id).await? {
        return Err(ApiError::NotFound("Baby not found".to_string()));
    }

    info!(family_id = %family_id, baby_id = %id, "Baby deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Current status of a baby
///
/// # Response
///
/// ```json
/// {
///   "baby_id": "uuid",
///   "last_feed": "2024-05-01T09:30:00Z",
///   "minutes_since_feed": 190,
///   "feed_warning": true,
///   "last_diaper": null,
///   "minutes_since_diaper": null,
///   "diaper_warning": false,
///   "last_sleep_start": "2024-05-01T07:00:00Z",
///   "last_sleep_end": null,
///   "sleeping": true
/// }
/// ```
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BabyStatus>> {
    let family_id = require_family(&auth)?;
    let baby = load_baby(&state, family_id, id).await?;

    Ok(Json(status::load(&state.db, &baby, Utc::now()).await?))
}

/// Merged activity timeline
///
/// Every entry is the log record plus a `kind` tag, ordered by the time the
/// activity happened, newest first.
pub async fn timeline(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<Vec<TimelineEntry>>> {
    let family_id = require_family(&auth)?;
    let baby = load_baby(&state, family_id, id).await?;

    if let (Some(start), Some(end)) = (query.start, query.end) {
        if end < start {
            return Err(ApiError::invalid_field("end", "End must not be before start"));
        }
    }

    let entries = timeline::load(
        &state.db,
        family_id,
        baby.id,
        query.start,
        query.end,
        query.limit,
    )
    .await?;

    Ok(Json(entries))
}
