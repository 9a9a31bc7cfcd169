/// Family settings, activity tile preferences and the unit catalogue
///
/// # Endpoints
///
/// - `GET /v1/settings` - Family settings
/// - `PUT /v1/settings` - Change name, PIN or default units (family admin)
/// - `GET /v1/settings/activities` - Effective tile order and visibility
/// - `PUT /v1/settings/activities` - Save tile order and visibility
/// - `GET /v1/units?activity=` - Unit catalogue (public)

use super::logs::check_unit;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use babycontrol_shared::{
    activity::settings::{
        self as activity_settings, EffectiveSettings, SettingsScope, SettingsSource,
    },
    auth::{
        authorization::{require_admin, require_family},
        middleware::AuthContext,
        password,
    },
    models::{
        activity_log::ActivityKind,
        settings::{Settings, UpdateSettings},
    },
    units::{self, Unit},
    validation,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 100, message = "Family name must be 1-100 characters"))]
    pub family_name: Option<String>,

    #[validate(custom(function = "validation::validate_pin"))]
    pub security_pin: Option<String>,

    pub default_bottle_unit: Option<String>,
    pub default_solids_unit: Option<String>,
    pub default_height_unit: Option<String>,
    pub default_weight_unit: Option<String>,
    pub default_temp_unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivitySettingsRequest {
    pub order: Vec<String>,

    /// Omitted means every kind is shown
    pub visible: Option<Vec<String>>,

    #[serde(default)]
    pub scope: SettingsScope,
}

#[derive(Debug, Default, Deserialize)]
pub struct UnitsQuery {
    pub activity: Option<String>,
}

/// Validates a default unit and returns its catalogue spelling
fn default_unit(
    field: &str,
    abbr: Option<String>,
    activity_type: &str,
) -> ApiResult<Option<String>> {
    let Some(abbr) = abbr else {
        return Ok(None);
    };
    check_unit(field, Some(abbr.as_str()), activity_type)?;

    Ok(units::find(&abbr).map(|unit| unit.abbr.to_string()))
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Settings>> {
    let family_id = require_family(&auth)?;

    let settings = Settings::find_by_family(&state.db, family_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Settings not found".to_string()))?;

    Ok(Json(settings))
}

/// Updates family settings
///
/// Each default unit must be one the catalogue lists for that activity,
/// e.g. `default_temp_unit` accepts `F` or `C`.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a family admin
/// - `422 Unprocessable Entity`: Bad PIN, name or unit
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<Settings>> {
    let family_id = require_admin(&auth)?;
    req.validate()?;

    let data = UpdateSettings {
        default_bottle_unit: default_unit(
            "default_bottle_unit",
            req.default_bottle_unit,
            "bottle",
        )?,
        default_solids_unit: default_unit(
            "default_solids_unit",
            req.default_solids_unit,
            "solids",
        )?,
        default_height_unit: default_unit(
            "default_height_unit",
            req.default_height_unit,
            "height",
        )?,
        default_weight_unit: default_unit(
            "default_weight_unit",
            req.default_weight_unit,
            "weight",
        )?,
        default_temp_unit: default_unit("default_temp_unit", req.default_temp_unit, "temp")?,
        security_pin_hash: req
            .security_pin
            .as_deref()
            .map(password::hash_password)
            .transpose()?,
        family_name: req.family_name,
    };
    let pin_changed = data.security_pin_hash.is_some();

    let settings = Settings::update(&state.db, family_id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("Settings not found".to_string()))?;

    info!(family_id = %family_id, pin_changed, "Family settings updated");

    Ok(Json(settings))
}

/// Tile order and visibility as the caller sees them
///
/// A caretaker's own settings win over the family default; with neither
/// stored every kind is shown in canonical order.
pub async fn get_activity_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<EffectiveSettings>> {
    let family_id = require_family(&auth)?;

    Ok(Json(
        activity_settings::effective(&state.db, family_id, auth.caretaker_id()).await?,
    ))
}

/// Saves tile order and visibility
///
/// # Endpoint
///
/// ```text
/// PUT /v1/settings/activities
///
/// { "order": ["feed", "diaper", "sleep"], "visible": ["feed", "sleep"], "scope": "caretaker" }
/// ```
///
/// Kinds left out of `order` are appended in canonical order. `scope:
/// "family"` writes the family default and needs a family admin.
///
/// # Errors
///
/// - `403 Forbidden`: Family scope without admin role
/// - `422 Unprocessable Entity`: Unknown kind, or caretaker scope without a caretaker login
pub async fn update_activity_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateActivitySettingsRequest>,
) -> ApiResult<Json<EffectiveSettings>> {
    let (family_id, caretaker_id, source) = match req.scope {
        SettingsScope::Family => (require_admin(&auth)?, None, SettingsSource::Family),
        SettingsScope::Caretaker => {
            let family_id = require_family(&auth)?;
            let caretaker_id = auth.caretaker_id().ok_or_else(|| {
                ApiError::invalid_field("scope", "Only caretakers have personal settings")
            })?;
            (family_id, Some(caretaker_id), SettingsSource::Caretaker)
        }
    };

    let visible = req.visible.unwrap_or_else(|| {
        ActivityKind::ALL
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect()
    });
    let preferences = activity_settings::normalize(&req.order, &visible)?;
    let preferences =
        activity_settings::save(&state.db, family_id, caretaker_id, &preferences).await?;

    Ok(Json(EffectiveSettings { preferences, source }))
}

pub async fn list_units(Query(query): Query<UnitsQuery>) -> Json<Vec<&'static Unit>> {
    Json(match query.activity.as_deref() {
        Some(activity) => units::for_activity(activity),
        None => units::UNITS.iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_unit_canonical_spelling() {
        assert_eq!(
            default_unit("default_temp_unit", Some("c".to_string()), "temp").unwrap(),
            Some("C".to_string())
        );
        assert_eq!(default_unit("default_temp_unit", None, "temp").unwrap(), None);
        assert!(default_unit("default_temp_unit", Some("KG".to_string()), "temp").is_err());
    }

    #[test]
    fn test_scope_defaults_to_caretaker() {
        let req: UpdateActivitySettingsRequest =
            serde_json::from_value(serde_json::json!({ "order": ["feed"] })).unwrap();
        assert_eq!(req.scope, SettingsScope::Caretaker);
        assert!(req.visible.is_none());
    }

    #[tokio::test]
    async fn test_list_units_filters_by_activity() {
        let Json(units) = list_units(Query(UnitsQuery {
            activity: Some("temp".to_string()),
        }))
        .await;
        let abbrs: Vec<_> = units.iter().map(|u| u.abbr).collect();
        assert_eq!(abbrs, vec!["F", "C"]);
    }
}
