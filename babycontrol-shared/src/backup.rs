/// Whole-database JSON snapshots for self-hosted instances
///
/// A snapshot maps every application table to a JSON array of its rows:
///
/// ```json
/// { "version": 1, "created_at": "...", "tables": { "families": [...], ... } }
/// ```
///
/// Restore replaces everything inside one transaction: all tables are
/// truncated, then reloaded in foreign-key order with
/// `jsonb_populate_recordset`. The `accounts.family_id` constraint is
/// deferrable so the accounts/families cycle loads in either order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::BTreeMap;
use thiserror::Error;

/// Snapshot format version; bump whenever the schema changes
pub const SNAPSHOT_VERSION: u32 = 1;

/// Tables in load order (parents before children)
pub const TABLES: &[&str] = &[
    "accounts",
    "families",
    "settings",
    "caretakers",
    "babies",
    "medicines",
    "sleep_logs",
    "feed_logs",
    "diaper_logs",
    "bath_logs",
    "pump_logs",
    "notes",
    "milestones",
    "measurements",
    "medicine_logs",
    "activity_settings",
    "app_config",
    "email_config",
    "family_setup_invites",
    "stripe_events",
];

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Snapshot version {found} does not match expected version {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub tables: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Number of rows per table
    pub fn row_counts(&self) -> BTreeMap<&str, usize> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_array().map_or(0, Vec::len)))
            .collect()
    }

    /// Checks version, table names and row shape before anything is written
    pub fn validate(&self) -> Result<(), BackupError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(BackupError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: self.version,
            });
        }

        for (name, rows) in &self.tables {
            if !TABLES.contains(&name.as_str()) {
                return Err(BackupError::InvalidSnapshot(format!("unknown table '{}'", name)));
            }
            let rows = rows.as_array().ok_or_else(|| {
                BackupError::InvalidSnapshot(format!("table '{}' is not an array", name))
            })?;
            if rows.iter().any(|row| !row.is_object()) {
                return Err(BackupError::InvalidSnapshot(format!(
                    "table '{}' contains a non-object row",
                    name
                )));
            }
        }

        Ok(())
    }
}

pub async fn export(pool: &PgPool) -> Result<Snapshot, BackupError> {
    let mut tables = BTreeMap::new();

    for table in TABLES {
        let (rows,): (Value,) = sqlx::query_as(&format!(
            "SELECT COALESCE(jsonb_agg(to_jsonb(t)), '[]'::jsonb) FROM {} t",
            table
        ))
        .fetch_one(pool)
        .await?;
        tables.insert(table.to_string(), rows);
    }

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        tables,
    };

    tracing::info!(tables = snapshot.tables.len(), "Backup snapshot exported");

    Ok(snapshot)
}

/// Replaces all data with `snapshot`
///
/// Tables absent from the snapshot end up empty.
pub async fn restore(pool: &PgPool, snapshot: &Snapshot) -> Result<(), BackupError> {
    snapshot.validate()?;

    let mut tx = pool.begin().await?;

    sqlx::query("SET CONSTRAINTS ALL DEFERRED")
        .execute(&mut *tx)
        .await?;

    sqlx::query(&format!("TRUNCATE {} CASCADE", TABLES.join(", ")))
        .execute(&mut *tx)
        .await?;

    for table in TABLES {
        let Some(rows) = snapshot.tables.get(*table) else {
            continue;
        };
        if rows.as_array().map_or(true, Vec::is_empty) {
            continue;
        }

        let inserted = sqlx::query(&format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1)",
            table = table
        ))
        .bind(rows)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tracing::debug!(table = %table, rows = inserted, "Table restored");
    }

    tx.commit().await?;

    tracing::info!(
        created_at = %snapshot.created_at,
        "Backup snapshot restored"
    );

    Ok(())
}
