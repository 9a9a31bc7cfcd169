/// Deployment-mode route gating.
///
/// Routes that only exist in one deployment mode answer 404 in the other,
/// exactly as if they were never mounted.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;

fn feature_disabled_response(feature_name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "feature_disabled",
            "message": format!("{} are not available in this deployment", feature_name)
        })),
    )
        .into_response()
}

/// Accounts and Stripe billing: SaaS only
pub async fn require_accounts(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.config.deployment.mode.accounts_enabled() {
        return feature_disabled_response("Accounts");
    }
    next.run(req).await
}

/// Backup download and restore: self-hosted only
pub async fn require_backup(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.config.deployment.mode.backup_enabled() {
        return feature_disabled_response("Backups");
    }
    next.run(req).await
}
