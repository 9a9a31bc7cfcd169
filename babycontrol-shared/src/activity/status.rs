/// At-a-glance status of a baby
///
/// Reports when the baby last fed, was changed and slept, and raises a
/// warning once the time since the last feed or diaper change reaches the
/// baby's configured threshold. A baby with no feed (or diaper) on record
/// never warns for it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::activity_log;
use crate::models::baby::{Baby, DEFAULT_DIAPER_WARNING_TIME, DEFAULT_FEED_WARNING_TIME};
use crate::models::diaper_log::DiaperLog;
use crate::models::feed_log::FeedLog;
use crate::models::sleep_log::SleepLog;
use crate::validation::parse_hh_mm;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BabyStatus {
    pub baby_id: Uuid,
    pub last_feed: Option<DateTime<Utc>>,
    pub minutes_since_feed: Option<i64>,
    pub feed_warning: bool,
    pub last_diaper: Option<DateTime<Utc>>,
    pub minutes_since_diaper: Option<i64>,
    pub diaper_warning: bool,
    pub last_sleep_start: Option<DateTime<Utc>>,
    pub last_sleep_end: Option<DateTime<Utc>>,
    pub sleeping: bool,
}

/// The latest activity a status is computed from
#[derive(Debug, Clone, Default)]
pub struct LatestActivity {
    pub feed: Option<DateTime<Utc>>,
    pub diaper: Option<DateTime<Utc>>,
    pub sleep_start: Option<DateTime<Utc>>,
    pub sleep_end: Option<DateTime<Utc>>,
    pub open_sleep: bool,
}

fn threshold_minutes(configured: &str, default: &str) -> i64 {
    parse_hh_mm(configured)
        .or_else(|| parse_hh_mm(default))
        .unwrap_or(0)
}

fn minutes_since(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    at.map(|at| (now - at).num_minutes().max(0))
}

pub fn compute(baby: &Baby, latest: &LatestActivity, now: DateTime<Utc>) -> BabyStatus {
    let feed_limit = threshold_minutes(&baby.feed_warning_time, DEFAULT_FEED_WARNING_TIME);
    let diaper_limit = threshold_minutes(&baby.diaper_warning_time, DEFAULT_DIAPER_WARNING_TIME);

    let minutes_since_feed = minutes_since(latest.feed, now);
    let minutes_since_diaper = minutes_since(latest.diaper, now);

    BabyStatus {
        baby_id: baby.id,
        last_feed: latest.feed,
        minutes_since_feed,
        feed_warning: minutes_since_feed.is_some_and(|m| m >= feed_limit),
        last_diaper: latest.diaper,
        minutes_since_diaper,
        diaper_warning: minutes_since_diaper.is_some_and(|m| m >= diaper_limit),
        last_sleep_start: latest.sleep_start,
        last_sleep_end: latest.sleep_end,
        sleeping: latest.open_sleep,
    }
}

pub async fn load(
    pool: &PgPool,
    baby: &Baby,
    now: DateTime<Utc>,
) -> Result<BabyStatus, sqlx::Error> {
    let feed: Option<FeedLog> = activity_log::latest(pool, baby.family_id, baby.id).await?;
    let diaper: Option<DiaperLog> = activity_log::latest(pool, baby.family_id, baby.id).await?;
    let sleep: Option<SleepLog> = activity_log::latest(pool, baby.family_id, baby.id).await?;
    let open_sleep = SleepLog::find_open(pool, baby.family_id, baby.id).await?;

    let latest = LatestActivity {
        feed: feed.map(|f| f.time),
        diaper: diaper.map(|d| d.time),
        sleep_start: sleep.as_ref().map(|s| s.start_time),
        sleep_end: sleep.and_then(|s| s.end_time),
        open_sleep: open_sleep.is_some(),
    };

    Ok(compute(baby, &latest, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn baby(feed_warning: &str, diaper_warning: &str) -> Baby {
        Baby {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Smith".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            gender: None,
            inactive: false,
            feed_warning_time: feed_warning.to_string(),
            diaper_warning_time: diaper_warning.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_warnings_at_threshold() {
        let now = Utc::now();
        let latest = LatestActivity {
            feed: Some(now - Duration::minutes(180)),
            diaper: Some(now - Duration::minutes(119)),
            ..Default::default()
        };

        let status = compute(&baby("03:00", "02:00"), &latest, now);
        assert_eq!(status.minutes_since_feed, Some(180));
        assert!(status.feed_warning);
        assert_eq!(status.minutes_since_diaper, Some(119));
        assert!(!status.diaper_warning);
    }

    #[test]
    fn test_no_records_no_warning() {
        let status = compute(&baby("00:30", "00:30"), &LatestActivity::default(), Utc::now());
        assert!(!status.feed_warning);
        assert!(!status.diaper_warning);
        assert_eq!(status.minutes_since_feed, None);
        assert!(!status.sleeping);
    }

    #[test]
    fn test_invalid_threshold_uses_default() {
        let now = Utc::now();
        let latest = LatestActivity {
            feed: Some(now - Duration::minutes(150)),
            ..Default::default()
        };

        // Falls back to 03:00
        let status = compute(&baby("soon", "02:00"), &latest, now);
        assert!(!status.feed_warning);
    }

    #[test]
    fn test_sleeping_flag() {
        let now = Utc::now();
        let latest = LatestActivity {
            sleep_start: Some(now - Duration::minutes(40)),
            open_sleep: true,
            ..Default::default()
        };

        let status = compute(&baby("03:00", "02:00"), &latest, now);
        assert!(status.sleeping);
        assert_eq!(status.last_sleep_end, None);
    }
}
