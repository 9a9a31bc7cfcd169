/// Stripe webhook receiver (SaaS deployments)
///
/// The raw body and `Stripe-Signature` header go through
/// `billing::construct_event` before anything is applied. Events are
/// idempotent by id, so Stripe's retries are safe.
///
/// # Responses
///
/// - `200 OK`: Event applied, ignored or already seen
/// - `400 Bad Request`: Missing or bad signature, or an unparseable event
/// - `500 Internal Server Error`: Secret not configured or database failure;
///   Stripe will redeliver

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, Json};
use babycontrol_shared::billing::{
    construct_event, process_event, BillingError, ReconcileOutcome, SIGNATURE_HEADER,
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or(BillingError::MissingSecret)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Stripe webhook without signature header");
            ApiError::BadRequest(format!("Missing {} header", SIGNATURE_HEADER))
        })?;

    let event = construct_event(&body, signature, secret).map_err(|e| {
        warn!(error = %e, "Rejected Stripe webhook");
        e
    })?;

    match process_event(&state.db, &event, Utc::now()).await? {
        ReconcileOutcome::Updated { account_id } => {
            info!(event_id = %event.id, account_id = %account_id, "Stripe event applied")
        }
        outcome => debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            outcome = ?outcome,
            "Stripe event processed"
        ),
    }

    Ok(Json(json!({ "received": true })))
}
