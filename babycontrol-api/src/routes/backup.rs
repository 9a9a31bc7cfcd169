/// Database backup and restore (self-hosted deployments)
///
/// # Endpoints
///
/// - `GET /v1/admin/backup` - Download every table as one JSON snapshot
/// - `POST /v1/admin/restore` - Replace all data with an uploaded snapshot
///
/// Both require the system administrator. Restore runs in one transaction;
/// a snapshot that fails validation leaves the database untouched.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use babycontrol_shared::{
    auth::{authorization::require_sys_admin, middleware::AuthContext},
    backup::{self, Snapshot},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
    pub snapshot_created_at: DateTime<Utc>,
    pub row_counts: BTreeMap<String, usize>,
}

pub(crate) fn backup_filename(created_at: DateTime<Utc>) -> String {
    format!("babycontrol-backup-{}.json", created_at.format("%Y%m%dT%H%M%SZ"))
}

/// Streams the snapshot as a file attachment
pub async fn download(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Response> {
    require_sys_admin(&auth)?;

    let snapshot = backup::export(&state.db).await?;
    let disposition = format!("attachment; filename=\"{}\"", backup_filename(snapshot.created_at));

    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(snapshot)).into_response())
}

/// Restores a snapshot
///
/// # Errors
///
/// - `400 Bad Request`: Wrong snapshot version, unknown table or malformed rows
/// - `403 Forbidden`: Not the system administrator
pub async fn restore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(snapshot): Json<Snapshot>,
) -> ApiResult<Json<RestoreResponse>> {
    require_sys_admin(&auth)?;

    backup::restore(&state.db, &snapshot).await?;

    let row_counts: BTreeMap<String, usize> = snapshot
        .row_counts()
        .into_iter()
        .map(|(table, count)| (table.to_string(), count))
        .collect();

    info!(
        snapshot_created_at = %snapshot.created_at,
        tables = row_counts.len(),
        rows = row_counts.values().sum::<usize>(),
        "Database restored from snapshot"
    );

    Ok(Json(RestoreResponse {
        restored: true,
        snapshot_created_at: snapshot.created_at,
        row_counts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_filename() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(backup_filename(at), "babycontrol-backup-20240501T093000Z.json");
    }
}
