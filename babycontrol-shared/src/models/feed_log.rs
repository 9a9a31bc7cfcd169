/// Feed logs
///
/// Breast feeds record a side and optionally a timed start/end; bottle and
/// solids feeds record an amount and unit. When a breast feed is timed and no
/// explicit duration is given, `feed_duration_seconds` is derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::activity_log::{span_seconds, ActivityKind, ActivityLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Breast,
    Bottle,
    Solids,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Breast => "breast",
            FeedType::Bottle => "bottle",
            FeedType::Solids => "solids",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "breast" => Some(FeedType::Breast),
            "bottle" => Some(FeedType::Bottle),
            "solids" => Some(FeedType::Solids),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreastSide {
    Left,
    Right,
}

impl BreastSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreastSide::Left => "left",
            BreastSide::Right => "right",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(BreastSide::Left),
            "right" => Some(BreastSide::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedLog {
    pub id: Uuid,
    pub family_id: Uuid,
    pub baby_id: Uuid,
    pub caretaker_id: Option<Uuid>,
    pub time: DateTime<Utc>,
    pub feed_type: String,
    pub amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub side: Option<String>,
    pub food: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub feed_duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ActivityLog for FeedLog {
    const KIND: ActivityKind = ActivityKind::Feed;
    const TABLE: &'static str = "feed_logs";
    const TIME_COLUMN: &'static str = "time";

    fn id(&self) -> Uuid {
        self.id
    }

    fn baby_id(&self) -> Uuid {
        self.baby_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.time
    }
}

#[derive(Debug, Clone)]
pub struct FeedLogInput {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,
    pub feed_type: FeedType,
    pub amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub side: Option<BreastSide>,
    pub food: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub feed_duration_seconds: Option<i32>,
}

impl FeedLogInput {
    /// Explicit duration, else end minus start
    pub fn effective_duration_seconds(&self) -> Option<i32> {
        self.feed_duration_seconds.or_else(|| match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end >= start => span_seconds(start, end),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedLogPatch {
    pub time: Option<DateTime<Utc>>,
    pub feed_type: Option<FeedType>,
    pub amount: Option<f64>,
    pub unit_abbr: Option<String>,
    pub side: Option<BreastSide>,
    pub food: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub feed_duration_seconds: Option<i32>,
}

impl FeedLogPatch {
    pub fn apply(self, current: &FeedLog) -> FeedLogInput {
        let times_changed = self.start_time.is_some() || self.end_time.is_some();

        FeedLogInput {
            baby_id: current.baby_id,
            time: self.time.unwrap_or(current.time),
            feed_type: self
                .feed_type
                .or_else(|| FeedType::from_str(&current.feed_type))
                .unwrap_or(FeedType::Bottle),
            amount: self.amount.or(current.amount),
            unit_abbr: self.unit_abbr.or_else(|| current.unit_abbr.clone()),
            side: self
                .side
                .or_else(|| current.side.as_deref().and_then(BreastSide::from_str)),
            food: self.food.or_else(|| current.food.clone()),
            start_time: self.start_time.or(current.start_time),
            end_time: self.end_time.or(current.end_time),
            // A retimed feed recomputes its duration unless one is given
            feed_duration_seconds: match self.feed_duration_seconds {
                Some(seconds) => Some(seconds),
                None if times_changed => None,
                None => current.feed_duration_seconds,
            },
        }
    }
}

impl FeedLog {
    pub async fn create(
        pool: &PgPool,
        family_id: Uuid,
        caretaker_id: Option<Uuid>,
        input: FeedLogInput,
    ) -> Result<Self, sqlx::Error> {
        let duration = input.effective_duration_seconds();

        sqlx::query_as::<_, FeedLog>(
            r#"
            INSERT INTO feed_logs
                (family_id, baby_id, caretaker_id, time, feed_type, amount, unit_abbr,
                 side, food, start_time, end_time, feed_duration_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(family_id)
        .bind(input.baby_id)
        .bind(caretaker_id)
        .bind(input.time)
        .bind(input.feed_type.as_str())
        .bind(input.amount)
        .bind(input.unit_abbr)
        .bind(input.side.map(|s| s.as_str()))
        .bind(input.food)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(duration)
        .fetch_one(pool)
        .await
    }

    pub async fn replace(
        pool: &PgPool,
        family_id: Uuid,
        id: Uuid,
        input: FeedLogInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        let duration = input.effective_duration_seconds();

        sqlx::query_as::<_, FeedLog>(
            r#"
            UPDATE feed_logs
            SET time = $3, feed_type = $4, amount = $5, unit_abbr = $6, side = $7, food = $8,
                start_time = $9, end_time = $10, feed_duration_seconds = $11, updated_at = NOW()
            WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(family_id)
        .bind(input.time)
        .bind(input.feed_type.as_str())
        .bind(input.amount)
        .bind(input.unit_abbr)
        .bind(input.side.map(|s| s.as_str()))
        .bind(input.food)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(duration)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> FeedLogInput {
        FeedLogInput {
            baby_id: Uuid::new_v4(),
            time: Utc::now(),
            feed_type: FeedType::Breast,
            amount: None,
            unit_abbr: None,
            side: Some(BreastSide::Left),
            food: None,
            start_time: None,
            end_time: None,
            feed_duration_seconds: None,
        }
    }

    #[test]
    fn test_duration_derived_from_times() {
        let start = Utc::now();
        let mut feed = input();
        feed.start_time = Some(start);
        feed.end_time = Some(start + Duration::seconds(754));
        assert_eq!(feed.effective_duration_seconds(), Some(754));
    }

    #[test]
    fn test_explicit_duration_wins() {
        let start = Utc::now();
        let mut feed = input();
        feed.start_time = Some(start);
        feed.end_time = Some(start + Duration::seconds(754));
        feed.feed_duration_seconds = Some(600);
        assert_eq!(feed.effective_duration_seconds(), Some(600));
    }

    #[test]
    fn test_no_times_no_duration() {
        assert_eq!(input().effective_duration_seconds(), None);

        let start = Utc::now();
        let mut backwards = input();
        backwards.start_time = Some(start);
        backwards.end_time = Some(start - Duration::seconds(5));
        assert_eq!(backwards.effective_duration_seconds(), None);
    }

    #[test]
    fn test_overlong_span_has_no_duration() {
        let mut feed = input();
        feed.start_time = Some(
            DateTime::parse_from_rfc3339("1900-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        feed.end_time = Some(
            DateTime::parse_from_rfc3339("2100-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        assert_eq!(feed.effective_duration_seconds(), None);
    }

    #[test]
    fn test_feed_type_strings() {
        assert_eq!(FeedType::from_str("solids"), Some(FeedType::Solids));
        assert_eq!(FeedType::from_str("formula"), None);
        assert_eq!(BreastSide::Right.as_str(), "right");
    }
}
