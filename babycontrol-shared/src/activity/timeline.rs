/// Merged activity timeline for one baby
///
/// Each entry serializes as the log record with a `kind` tag added:
///
/// ```json
/// { "kind": "feed", "id": "...", "time": "...", "feed_type": "bottle", ... }
/// ```
///
/// Entries are ordered by their primary time, newest first. Equal times are
/// ordered by kind name, then id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use std::cmp::Ordering;
use thiserror::Error;
use uuid::Uuid;

use crate::models::activity_log::{self, ActivityKind, ActivityLog, LogFilter};
use crate::models::bath_log::BathLog;
use crate::models::diaper_log::DiaperLog;
use crate::models::feed_log::FeedLog;
use crate::models::measurement::Measurement;
use crate::models::medicine_log::MedicineLog;
use crate::models::milestone::Milestone;
use crate::models::note::Note;
use crate::models::pump_log::PumpLog;
use crate::models::sleep_log::SleepLog;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Failed to encode timeline entry: {0}")]
    EncodeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub kind: ActivityKind,

    #[serde(skip)]
    pub time: DateTime<Utc>,

    #[serde(skip)]
    pub id: Uuid,

    #[serde(flatten)]
    pub record: Value,
}

impl TimelineEntry {
    pub fn from_log<T: ActivityLog>(log: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: T::KIND,
            time: log.occurred_at(),
            id: log.id(),
            record: serde_json::to_value(log)?,
        })
    }

    fn timeline_cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| self.kind.as_str().cmp(other.kind.as_str()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sorts entries into timeline order and keeps the first `limit`
pub fn merge(mut entries: Vec<TimelineEntry>, limit: usize) -> Vec<TimelineEntry> {
    entries.sort_by(TimelineEntry::timeline_cmp);
    entries.truncate(limit);
    entries
}

async fn collect<T: ActivityLog>(
    pool: &PgPool,
    family_id: Uuid,
    filter: &LogFilter,
    out: &mut Vec<TimelineEntry>,
) -> Result<(), TimelineError> {
    let rows: Vec<T> = activity_log::list(pool, family_id, filter).await?;
    for row in &rows {
        out.push(TimelineEntry::from_log(row)?);
    }
    Ok(())
}

/// Loads up to `limit` entries across every log kind
///
/// Each kind is queried with the same limit, which is enough to fill the
/// merged page.
pub async fn load(
    pool: &PgPool,
    family_id: Uuid,
    baby_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: Option<i64>,
) -> Result<Vec<TimelineEntry>, TimelineError> {
    let filter = LogFilter {
        baby_id: Some(baby_id),
        start,
        end,
        limit,
        offset: None,
    };

    let mut entries = Vec::new();
    collect::<SleepLog>(pool, family_id, &filter, &mut entries).await?;
    collect::<FeedLog>(pool, family_id, &filter, &mut entries).await?;
    collect::<DiaperLog>(pool, family_id, &filter, &mut entries).await?;
    collect::<Note>(pool, family_id, &filter, &mut entries).await?;
    collect::<BathLog>(pool, family_id, &filter, &mut entries).await?;
    collect::<PumpLog>(pool, family_id, &filter, &mut entries).await?;
    collect::<Measurement>(pool, family_id, &filter, &mut entries).await?;
    collect::<Milestone>(pool, family_id, &filter, &mut entries).await?;
    collect::<MedicineLog>(pool, family_id, &filter, &mut entries).await?;

    tracing::debug!(
        baby_id = %baby_id,
        fetched = entries.len(),
        "Timeline entries loaded"
    );

    Ok(merge(entries, filter.effective_limit() as usize))
}
