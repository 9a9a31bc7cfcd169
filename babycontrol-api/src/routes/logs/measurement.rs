/// Measurement create/update
///
/// The unit must belong to the measurement type: height and head
/// circumference take length units, weight takes weight units and
/// temperature takes temperature units.

use super::{check_unit, load_current, not_found};
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
    models::measurement::{Measurement, MeasurementInput, MeasurementPatch, MeasurementType},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMeasurementRequest {
    pub baby_id: Uuid,
    pub date: DateTime<Utc>,
    pub measurement_type: MeasurementType,

    #[validate(range(exclusive_min = 0.0, message = "Value must be positive"))]
    pub value: f64,

    #[validate(length(min = 1, max = 10, message = "Unit is required"))]
    pub unit: String,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeasurementRequest {
    pub date: Option<DateTime<Utc>>,
    pub measurement_type: Option<MeasurementType>,

    #[validate(range(exclusive_min = 0.0, message = "Value must be positive"))]
    pub value: Option<f64>,

    #[validate(length(min = 1, max = 10, message = "Unit is required"))]
    pub unit: Option<String>,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

fn check_measurement(input: &MeasurementInput) -> ApiResult<()> {
    check_unit(
        "unit",
        Some(input.unit.as_str()),
        input.measurement_type.unit_activity(),
    )
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateMeasurementRequest>,
) -> ApiResult<(StatusCode, Json<Measurement>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let input = MeasurementInput {
        baby_id: req.baby_id,
        date: req.date,
        measurement_type: req.measurement_type,
        value: req.value,
        unit: req.unit,
        notes: req.notes,
    };
    check_measurement(&input)?;
    require_baby_in_family(&state.db, family_id, input.baby_id).await?;

    let measurement = Measurement::create(&state.db, family_id, auth.caretaker_id(), input).await?;

    Ok((StatusCode::CREATED, Json(measurement)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMeasurementRequest>,
) -> ApiResult<Json<Measurement>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: Measurement = load_current(&state, family_id, id).await?;
    let input = MeasurementPatch {
        date: req.date,
        measurement_type: req.measurement_type,
        value: req.value,
        unit: req.unit,
        notes: req.notes,
    }
    .apply(&current);
    check_measurement(&input)?;

    let measurement = Measurement::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<Measurement>)?;

    Ok(Json(measurement))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(measurement_type: MeasurementType, unit: &str) -> MeasurementInput {
        MeasurementInput {
            baby_id: Uuid::new_v4(),
            date: Utc::now(),
            measurement_type,
            value: 1.0,
            unit: unit.to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_unit_follows_measurement_type() {
        assert!(check_measurement(&input(MeasurementType::Weight, "KG")).is_ok());
        assert!(check_measurement(&input(MeasurementType::HeadCircumference, "CM")).is_ok());
        assert!(check_measurement(&input(MeasurementType::Temperature, "F")).is_ok());
        assert!(check_measurement(&input(MeasurementType::Weight, "CM")).is_err());
        assert!(check_measurement(&input(MeasurementType::Height, "LB")).is_err());
    }

    #[test]
    fn test_value_must_be_positive() {
        let req: CreateMeasurementRequest = serde_json::from_value(serde_json::json!({
            "baby_id": Uuid::new_v4(),
            "date": "2024-05-01T10:00:00Z",
            "measurement_type": "weight",
            "value": 0.0,
            "unit": "KG"
        }))
        .unwrap();

        assert!(req.validate().unwrap_err().field_errors().contains_key("value"));
    }
}
