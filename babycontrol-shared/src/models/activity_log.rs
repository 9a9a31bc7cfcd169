/// Shared behaviour of the activity log tables
///
/// Every log table has `id`, `family_id`, `baby_id`, `caretaker_id`,
/// timestamps and a soft-delete column, plus one "primary time" column the
/// log is ordered by. [`ActivityLog`] captures that shape so listing,
/// lookup and deletion are written once.
///
/// # Example
///
/// ```no_run
/// use babycontrol_shared::models::activity_log::{self, LogFilter};
/// use babycontrol_shared::models::feed_log::FeedLog;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, family_id: Uuid, baby_id: Uuid) -> Result<(), sqlx::Error> {
/// let filter = LogFilter {
///     baby_id: Some(baby_id),
///     ..Default::default()
/// };
/// let feeds: Vec<FeedLog> = activity_log::list(&pool, family_id, &filter).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The kinds of activity a family can log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Sleep,
    Feed,
    Diaper,
    Note,
    Bath,
    Pump,
    Measurement,
    Milestone,
    Medicine,
}

impl ActivityKind {
    /// Canonical order used for activity tiles when nothing is configured
    pub const ALL: [ActivityKind; 9] = [
        ActivityKind::Sleep,
        ActivityKind::Feed,
        ActivityKind::Diaper,
        ActivityKind::Note,
        ActivityKind::Bath,
        ActivityKind::Pump,
        ActivityKind::Measurement,
        ActivityKind::Milestone,
        ActivityKind::Medicine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Sleep => "sleep",
            ActivityKind::Feed => "feed",
            ActivityKind::Diaper => "diaper",
            ActivityKind::Note => "note",
            ActivityKind::Bath => "bath",
            ActivityKind::Pump => "pump",
            ActivityKind::Measurement => "measurement",
            ActivityKind::Milestone => "milestone",
            ActivityKind::Medicine => "medicine",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown activity kind '{0}'")]
pub struct UnknownActivityKind(pub String);

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownActivityKind(s.to_string()))
    }
}

/// A row of one of the activity log tables
pub trait ActivityLog: for<'r> sqlx::FromRow<'r, PgRow> + Serialize + Send + Unpin {
    const KIND: ActivityKind;

    /// Table name; also used as the resource name in errors
    const TABLE: &'static str;

    /// Column holding the time the activity happened
    const TIME_COLUMN: &'static str;

    fn id(&self) -> Uuid;
    fn baby_id(&self) -> Uuid;
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// List query parameters shared by every log endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogFilter {
    pub baby_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LogFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Whole seconds from `start` to `end`, `None` if it does not fit an `i32`
pub fn span_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<i32> {
    i32::try_from((end - start).num_seconds()).ok()
}

/// Whole minutes between `start` and `end`, `None` while still open
///
/// Spans are bounded by [`check_time_range`]; anything longer saturates.
pub fn duration_minutes(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Option<i32> {
    end.map(|end| i32::try_from((end - start).num_minutes().max(0)).unwrap_or(i32::MAX))
}

/// Rejects an end time before its start time, or a span whose length in
/// seconds does not fit the `INTEGER` duration columns
pub fn check_time_range(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<(), String> {
    match end {
        Some(end) if end < start => Err("End time must not be before start time".to_string()),
        Some(end) if span_seconds(start, end).is_none() => {
            Err("Time span is too long".to_string())
        }
        _ => Ok(()),
    }
}

/// Lists live rows of `T` for a family, newest first
pub async fn list<T: ActivityLog>(
    pool: &PgPool,
    family_id: Uuid,
    filter: &LogFilter,
) -> Result<Vec<T>, sqlx::Error> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT * FROM {} WHERE deleted_at IS NULL AND family_id = ",
        T::TABLE
    ));
    qb.push_bind(family_id);

    if let Some(baby_id) = filter.baby_id {
        qb.push(" AND baby_id = ").push_bind(baby_id);
    }
    if let Some(start) = filter.start {
        qb.push(format!(" AND {} >= ", T::TIME_COLUMN)).push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(format!(" AND {} <= ", T::TIME_COLUMN)).push_bind(end);
    }

    qb.push(format!(" ORDER BY {} DESC, id DESC LIMIT ", T::TIME_COLUMN))
        .push_bind(filter.effective_limit())
        .push(" OFFSET ")
        .push_bind(filter.effective_offset());

    qb.build_query_as::<T>().fetch_all(pool).await
}

/// Finds a live row of `T` within a family
pub async fn find<T: ActivityLog>(
    pool: &PgPool,
    family_id: Uuid,
    id: Uuid,
) -> Result<Option<T>, sqlx::Error> {
    sqlx::query_as::<_, T>(&format!(
        "SELECT * FROM {} WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
        T::TABLE
    ))
    .bind(id)
    .bind(family_id)
    .fetch_optional(pool)
    .await
}

/// Most recent live row of `T` for a baby
pub async fn latest<T: ActivityLog>(
    pool: &PgPool,
    family_id: Uuid,
    baby_id: Uuid,
) -> Result<Option<T>, sqlx::Error> {
    sqlx::query_as::<_, T>(&format!(
        "SELECT * FROM {table} WHERE family_id = $1 AND baby_id = $2 AND deleted_at IS NULL \
         ORDER BY {time} DESC, id DESC LIMIT 1",
        table = T::TABLE,
        time = T::TIME_COLUMN
    ))
    .bind(family_id)
    .bind(baby_id)
    .fetch_optional(pool)
    .await
}

pub async fn soft_delete<T: ActivityLog>(
    pool: &PgPool,
    family_id: Uuid,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(&format!(
        "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND family_id = $2 AND deleted_at IS NULL",
        T::TABLE
    ))
    .bind(id)
    .bind(family_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_kind_round_trip_and_order() {
        for kind in ActivityKind::ALL {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
        assert!("nap".parse::<ActivityKind>().is_err());
        assert_eq!(ActivityKind::ALL[0], ActivityKind::Sleep);
        assert_eq!(
            serde_json::to_string(&ActivityKind::Measurement).unwrap(),
            "\"measurement\""
        );
    }

    #[test]
    fn test_filter_limits() {
        assert_eq!(LogFilter::default().effective_limit(), 50);

        let filter = LogFilter {
            limit: Some(10_000),
            offset: Some(-4),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 500);
        assert_eq!(filter.effective_offset(), 0);

        let filter = LogFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 1);
    }

    #[test]
    fn test_duration_minutes() {
        let start = Utc::now();
        assert_eq!(duration_minutes(start, None), None);
        assert_eq!(duration_minutes(start, Some(start + Duration::minutes(95))), Some(95));
        assert_eq!(duration_minutes(start, Some(start + Duration::seconds(59))), Some(0));
    }

    #[test]
    fn test_time_range() {
        let start = Utc::now();
        assert!(check_time_range(start, None).is_ok());
        assert!(check_time_range(start, Some(start)).is_ok());
        assert!(check_time_range(start, Some(start - Duration::minutes(1))).is_err());
    }

    #[test]
    fn test_span_beyond_i32_seconds_rejected() {
        let start = DateTime::parse_from_rfc3339("1900-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2100-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(span_seconds(start, end), None);
        assert_eq!(check_time_range(start, Some(end)).unwrap_err(), "Time span is too long");
        assert_eq!(span_seconds(start, start + Duration::days(30)), Some(2_592_000));
    }
}
