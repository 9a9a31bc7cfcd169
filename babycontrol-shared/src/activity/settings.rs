/// Activity tile order and visibility
///
/// Settings resolve from most to least specific: the caretaker's own row,
/// then the family default row, then the built-in canonical order with every
/// tile visible. Saving overwrites the row for the chosen scope.
///
/// Normalisation rules applied to every write:
///
/// - an unknown kind in `order` is rejected
/// - duplicates are dropped, keeping the first occurrence
/// - kinds missing from `order` are appended in canonical order
/// - `visible` keeps only known kinds, re-ordered to follow `order`

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::activity_log::ActivityKind;
use crate::models::activity_settings::ActivitySettings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown activity kind '{0}'")]
    UnknownKind(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPreferences {
    pub order: Vec<ActivityKind>,
    pub visible: Vec<ActivityKind>,
}

impl Default for ActivityPreferences {
    fn default() -> Self {
        Self {
            order: ActivityKind::ALL.to_vec(),
            visible: ActivityKind::ALL.to_vec(),
        }
    }
}

/// Which row a save targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsScope {
    #[default]
    Caretaker,
    Family,
}

/// Where effective settings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    Caretaker,
    Family,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    #[serde(flatten)]
    pub preferences: ActivityPreferences,
    pub source: SettingsSource,
}

fn arrange(
    order: impl IntoIterator<Item = ActivityKind>,
    visible: impl IntoIterator<Item = ActivityKind>,
) -> ActivityPreferences {
    let mut seen = HashSet::new();
    let mut full_order: Vec<ActivityKind> = order.into_iter().filter(|k| seen.insert(*k)).collect();
    full_order.extend(ActivityKind::ALL.into_iter().filter(|k| !seen.contains(k)));

    let shown: HashSet<ActivityKind> = visible.into_iter().collect();
    let visible = full_order
        .iter()
        .copied()
        .filter(|k| shown.contains(k))
        .collect();

    ActivityPreferences {
        order: full_order,
        visible,
    }
}

/// Validates and normalises client-supplied settings
pub fn normalize(
    order: &[String],
    visible: &[String],
) -> Result<ActivityPreferences, SettingsError> {
    let order = order
        .iter()
        .map(|raw| ActivityKind::from_str(raw).map_err(|e| SettingsError::UnknownKind(e.0)))
        .collect::<Result<Vec<_>, _>>()?;

    let visible = visible.iter().filter_map(|raw| ActivityKind::from_str(raw).ok());

    Ok(arrange(order, visible))
}

/// Reads a stored row, tolerating kinds that are no longer known
fn from_stored(row: &ActivitySettings) -> ActivityPreferences {
    arrange(
        row.activity_order
            .iter()
            .filter_map(|raw| ActivityKind::from_str(raw).ok()),
        row.visible
            .iter()
            .filter_map(|raw| ActivityKind::from_str(raw).ok()),
    )
}

fn to_strings(kinds: &[ActivityKind]) -> Vec<String> {
    kinds.iter().map(|k| k.as_str().to_string()).collect()
}

/// Resolves the settings a caller sees
pub async fn effective(
    pool: &PgPool,
    family_id: Uuid,
    caretaker_id: Option<Uuid>,
) -> Result<EffectiveSettings, SettingsError> {
    if caretaker_id.is_some() {
        if let Some(row) = ActivitySettings::find(pool, family_id, caretaker_id).await? {
            return Ok(EffectiveSettings {
                preferences: from_stored(&row),
                source: SettingsSource::Caretaker,
            });
        }
    }

    if let Some(row) = ActivitySettings::find(pool, family_id, None).await? {
        return Ok(EffectiveSettings {
            preferences: from_stored(&row),
            source: SettingsSource::Family,
        });
    }

    Ok(EffectiveSettings {
        preferences: ActivityPreferences::default(),
        source: SettingsSource::Default,
    })
}

/// Stores normalised settings for a caretaker, or as the family default
pub async fn save(
    pool: &PgPool,
    family_id: Uuid,
    caretaker_id: Option<Uuid>,
    preferences: &ActivityPreferences,
) -> Result<ActivityPreferences, SettingsError> {
    let row = ActivitySettings::upsert(
        pool,
        family_id,
        caretaker_id,
        &to_strings(&preferences.order),
        &to_strings(&preferences.visible),
    )
    .await?;

    tracing::debug!(
        family_id = %family_id,
        caretaker_id = ?caretaker_id,
        "Activity settings saved"
    );

    Ok(from_stored(&row))
}
