/// Feed log create/update
///
/// Breast feeds need a side; bottle and solids feeds take an amount whose
/// unit must be a bottle or solids unit respectively.

use super::{check_range, check_unit, load_current, not_found};
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
    models::feed_log::{BreastSide, FeedLog, FeedLogInput, FeedLogPatch, FeedType},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedLogRequest {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,
    pub feed_type: FeedType,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: Option<f64>,

    pub unit_abbr: Option<String>,
    pub side: Option<BreastSide>,

    #[validate(length(max = 200, message = "Food must be at most 200 characters"))]
    pub food: Option<String>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    pub feed_duration_seconds: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeedLogRequest {
    pub time: Option<DateTime<Utc>>,
    pub feed_type: Option<FeedType>,

    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: Option<f64>,

    pub unit_abbr: Option<String>,
    pub side: Option<BreastSide>,

    #[validate(length(max = 200, message = "Food must be at most 200 characters"))]
    pub food: Option<String>,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    #[validate(range(min = 0, message = "Duration must not be negative"))]
    pub feed_duration_seconds: Option<i32>,
}

/// Cross-field rules that depend on the feed type
fn check_feed(input: &FeedLogInput) -> ApiResult<()> {
    match input.feed_type {
        FeedType::Breast => {
            if input.side.is_none() {
                return Err(ApiError::invalid_field("side", "Side is required for breast feeds"));
            }
        }
        FeedType::Bottle => check_unit("unit_abbr", input.unit_abbr.as_deref(), "bottle")?,
        FeedType::Solids => check_unit("unit_abbr", input.unit_abbr.as_deref(), "solids")?,
    }

    if let Some(start) = input.start_time {
        check_range("end_time", start, input.end_time)?;
    }

    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateFeedLogRequest>,
) -> ApiResult<(StatusCode, Json<FeedLog>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let input = FeedLogInput {
        baby_id: req.baby_id,
        time: req.time,
        feed_type: req.feed_type,
        amount: req.amount,
        unit_abbr: req.unit_abbr,
        side: req.side,
        food: req.food,
        start_time: req.start_time,
        end_time: req.end_time,
        feed_duration_seconds: req.feed_duration_seconds,
    };
    check_feed(&input)?;
    require_baby_in_family(&state.db, family_id, input.baby_id).await?;

    let log = FeedLog::create(&state.db, family_id, auth.caretaker_id(), input).await?;

    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFeedLogRequest>,
) -> ApiResult<Json<FeedLog>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: FeedLog = load_current(&state, family_id, id).await?;
    let input = FeedLogPatch {
        time: req.time,
        feed_type: req.feed_type,
        amount: req.amount,
        unit_abbr: req.unit_abbr,
        side: req.side,
        food: req.food,
        start_time: req.start_time,
        end_time: req.end_time,
        feed_duration_seconds: req.feed_duration_seconds,
    }
    .apply(&current);
    check_feed(&input)?;

    let log = FeedLog::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<FeedLog>)?;

    Ok(Json(log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(feed_type: FeedType) -> FeedLogInput {
        FeedLogInput {
            baby_id: Uuid::new_v4(),
            time: Utc::now(),
            feed_type,
            amount: None,
            unit_abbr: None,
            side: None,
            food: None,
            start_time: None,
            end_time: None,
            feed_duration_seconds: None,
        }
    }

    #[test]
    fn test_breast_feed_needs_side() {
        assert!(check_feed(&input(FeedType::Breast)).is_err());

        let with_side = FeedLogInput {
            side: Some(BreastSide::Left),
            ..input(FeedType::Breast)
        };
        assert!(check_feed(&with_side).is_ok());
    }

    #[test]
    fn test_unit_must_match_feed_type() {
        let bottle = FeedLogInput {
            amount: Some(120.0),
            unit_abbr: Some("ML".to_string()),
            ..input(FeedType::Bottle)
        };
        assert!(check_feed(&bottle).is_ok());

        let solids_in_ml = FeedLogInput {
            unit_abbr: Some("ML".to_string()),
            ..input(FeedType::Solids)
        };
        assert!(check_feed(&solids_in_ml).is_err());
    }

    #[test]
    fn test_timed_feed_end_after_start() {
        let start = Utc::now();
        let backwards = FeedLogInput {
            side: Some(BreastSide::Right),
            start_time: Some(start),
            end_time: Some(start - Duration::minutes(1)),
            ..input(FeedType::Breast)
        };
        assert!(check_feed(&backwards).is_err());
    }

    #[test]
    fn test_timed_feed_span_must_fit() {
        let start = chrono::DateTime::parse_from_rfc3339("1900-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let centuries = FeedLogInput {
            side: Some(BreastSide::Left),
            start_time: Some(start),
            end_time: Some(start + Duration::days(365 * 200)),
            ..input(FeedType::Breast)
        };

        match check_feed(&centuries) {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "end_time"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
