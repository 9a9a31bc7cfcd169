/// Activity log endpoints
///
/// Listing, lookup and deletion work the same for every log kind and are
/// written once over [`ActivityLog`]; each kind's module adds its own create
/// and update handlers with kind-specific validation.
///
/// # Endpoints (per kind)
///
/// ```text
/// GET    /v1/<kind>?baby_id=&start=&end=&limit=&offset=
/// POST   /v1/<kind>
/// GET    /v1/<kind>/:id
/// PUT    /v1/<kind>/:id
/// DELETE /v1/<kind>/:id
/// ```
///
/// where `<kind>` is one of `sleep-logs`, `feed-logs`, `diaper-logs`,
/// `bath-logs`, `pump-logs`, `notes`, `milestones`, `measurements`,
/// `medicine-logs`.

pub mod bath;
pub mod diaper;
pub mod feed;
pub mod measurement;
pub mod medicine;
pub mod milestone;
pub mod note;
pub mod pump;
pub mod sleep;

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
    models::activity_log::{self, ActivityKind, ActivityLog, LogFilter},
    units,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Resource name used in error messages
pub(crate) fn resource_name(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Sleep => "Sleep log",
        ActivityKind::Feed => "Feed log",
        ActivityKind::Diaper => "Diaper log",
        ActivityKind::Note => "Note",
        ActivityKind::Bath => "Bath log",
        ActivityKind::Pump => "Pump log",
        ActivityKind::Measurement => "Measurement",
        ActivityKind::Milestone => "Milestone",
        ActivityKind::Medicine => "Medicine log",
    }
}

pub(crate) fn not_found<T: ActivityLog>() -> ApiError {
    ApiError::NotFound(format!("{} not found", resource_name(T::KIND)))
}

/// Rejects an end time before its start time, reported on `field`
pub(crate) fn check_range(
    field: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> ApiResult<()> {
    activity_log::check_time_range(start, end)
        .map_err(|message| ApiError::invalid_field(field, message))
}

/// Checks that a unit from the catalogue fits `activity_type`
pub(crate) fn check_unit(field: &str, abbr: Option<&str>, activity_type: &str) -> ApiResult<()> {
    match abbr {
        Some(abbr) if !units::applies_to(abbr, activity_type) => Err(ApiError::invalid_field(
            field,
            format!("'{}' is not a {} unit", abbr, activity_type),
        )),
        _ => Ok(()),
    }
}

/// Loads the row an update applies to
pub(crate) async fn load_current<T: ActivityLog>(
    state: &AppState,
    family_id: Uuid,
    id: Uuid,
) -> ApiResult<T> {
    activity_log::find::<T>(&state.db, family_id, id)
        .await?
        .ok_or_else(not_found::<T>)
}

/// Lists logs of one kind, newest first
///
/// `limit` defaults to 50 and is capped at 500.
pub async fn list<T>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<LogFilter>,
) -> ApiResult<Json<Vec<T>>>
where
    T: ActivityLog + Sync + 'static,
{
    let family_id = require_family(&auth)?;

    if let (Some(start), Some(end)) = (filter.start, filter.end) {
        if end < start {
            return Err(ApiError::invalid_field("end", "End must not be before start"));
        }
    }

    Ok(Json(activity_log::list::<T>(&state.db, family_id, &filter).await?))
}

pub async fn get<T>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<T>>
where
    T: ActivityLog + Sync + 'static,
{
    let family_id = require_family(&auth)?;

    Ok(Json(load_current::<T>(&state, family_id, id).await?))
}

/// Soft-deletes a log
pub async fn delete<T>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode>
where
    T: ActivityLog + Sync + 'static,
{
    let family_id = require_family(&auth)?;

    if !activity_log::soft_delete::<T>(&state.db, family_id, id).await? {
        return Err(not_found::<T>());
    }

    tracing::debug!(
        family_id = %family_id,
        kind = T::KIND.as_str(),
        log_id = %id,
        "Activity log deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use babycontrol_shared::models::feed_log::FeedLog;
    use chrono::Duration;

    #[test]
    fn test_check_unit() {
        assert!(check_unit("unit_abbr", Some("ML"), "bottle").is_ok());
        assert!(check_unit("unit_abbr", None, "bottle").is_ok());
        assert!(check_unit("unit_abbr", Some("KG"), "bottle").is_err());
        assert!(check_unit("unit_abbr", Some("furlong"), "pump").is_err());
    }

    #[test]
    fn test_check_range() {
        let start = Utc::now();
        assert!(check_range("end_time", start, None).is_ok());
        assert!(check_range("end_time", start, Some(start + Duration::minutes(5))).is_ok());
        assert!(check_range("end_time", start, Some(start - Duration::minutes(5))).is_err());
    }

    #[test]
    fn test_not_found_names_the_kind() {
        match not_found::<FeedLog>() {
            ApiError::NotFound(message) => assert_eq!(message, "Feed log not found"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
