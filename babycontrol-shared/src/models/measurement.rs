/// Growth and temperature measurements
///
/// Values must be positive; the schema enforces `value > 0` as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{ActivityKind, ActivityLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Height,
    Weight,
    HeadCircumference,
    Temperature,
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Height => "height",
            MeasurementType::Weight => "weight",
            MeasurementType::HeadCircumference => "head_circumference",
            MeasurementType::Temperature => "temperature",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "height" => Some(MeasurementType::Height),
            "weight" => Some(MeasurementType::Weight),
            "head_circumference" => Some(MeasurementType::HeadCircumference),
            "temperature" => Some(MeasurementType::Temperature),
            _ => None,
        }
    }

    /// Unit catalogue activity type this measurement draws units from
    pub fn unit_activity(&self) -> &'static str {
        match self {
            MeasurementType::Height | MeasurementType::HeadCircumference => "height",
            MeasurementType::Weight => "weight",
            MeasurementType::Temperature => "temp",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Measurement {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub measurement_type: String,
    pub value: f64,
    pub unit: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for Measurement {
    const KIND: ActivityKind = ActivityKind::Measurement;
    const TABLE: &'static str = "measurements";
    const TIME_COLUMN: &'static str = "date";

    fn id(&self) -> Uuid {
        self.id
    }

    fn baby_id(&self) -> Uuid {
        self.baby_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }
}

#[derive(Debug, Clone)]
pub struct MeasurementInput {
    pub baby_id: Uuid,
    pub date: DateTime<Utc>,
    pub measurement_type: MeasurementType,
    pub value: f64,
    pub unit: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MeasurementPatch {
    pub date: Option<DateTime<Utc>>,
    pub measurement_type: Option<MeasurementType>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

impl MeasurementPatch {
    pub fn apply(self, current: &Measurement) -> MeasurementInput {
        MeasurementInput {
            baby_id: current.baby_id,
            date: self.date.unwrap_or(current.date),
            measurement_type: self
                .measurement_type
                .or_else(|| MeasurementType::from_str(&current.measurement_type))
                .unwrap_or(MeasurementType::Weight),
            value: self.value.unwrap_or(current.value),
            unit: self.unit.unwrap_or_else(|| current.unit.clone()),
            notes: self.notes.or_else(|| current.notes.clone()),
        }
    }
}

impl Measurement {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: MeasurementInput,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Measurement>(
            r#"
            INSERT INTO measurements (family_id, baby_id, caretaker_id, date, measurement_type,
                                      value, unit, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.date)
        .bind(input.measurement_type.as_str())
        .bind(input.value)
        .bind(input.unit)
        .bind(input.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: MeasurementInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Measurement>(
            r#"
            UPDATE measurements
            SET date = $3, measurement_type = $4, value = $5, unit = $6, notes = $7,
                updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.date)
        .bind(input.measurement_type.as_str())
        .bind(input.value)
        .bind(input.unit)
        .bind(input.notes)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_activity() {
        assert_eq!(MeasurementType::HeadCircumference.unit_activity(), "height");
        assert_eq!(MeasurementType::Temperature.unit_activity(), "temp");
        assert_eq!(
            MeasurementType::from_str("head_circumference"),
            Some(MeasurementType::HeadCircumference)
        );
    }
}
