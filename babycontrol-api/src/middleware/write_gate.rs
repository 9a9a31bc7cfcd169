/// Payment write gate.
///
/// In SaaS mode a family whose owning account is expired or closed keeps
/// read access but every mutating request answers 402. Families without an
/// owning account (created by the system administrator) are never gated.

use axum::{
    extract::{Extension, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use babycontrol_shared::auth::middleware::AuthContext;
use babycontrol_shared::models::account::{AccessStatus, Account};
use chrono::Utc;

use crate::app::AppState;
use crate::error::ApiError;

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Decides whether a request may proceed given the owning account's status
pub fn check(method: &Method, status: Option<AccessStatus>) -> Result<(), ApiError> {
    match status {
        Some(status) if is_mutating(method) && !status.allows_writes() => {
            Err(ApiError::PaymentRequired(format!(
                "Account is {}; renew your subscription to record new data",
                status.as_str()
            )))
        }
        _ => Ok(()),
    }
}

pub async fn write_gate_layer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.deployment.mode.is_saas() || !is_mutating(request.method()) {
        return Ok(next.run(request).await);
    }

    if let Some(family_id) = auth.family_id {
        let status = Account::find_by_family(&state.db, family_id)
            .await?
            .map(|account| account.access_status(Utc::now()));

        if let Err(err) = check(request.method(), status) {
            tracing::info!(
                family_id = %family_id,
                method = %request.method(),
                path = %request.uri().path(),
                "Write blocked by payment gate"
            );
            return Err(err);
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_always_allowed() {
        assert!(check(&Method::GET, Some(AccessStatus::Expired)).is_ok());
        assert!(check(&Method::HEAD, Some(AccessStatus::Closed)).is_ok());
    }

    #[test]
    fn test_lapsed_accounts_blocked() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            assert!(matches!(
                check(&method, Some(AccessStatus::Expired)),
                Err(ApiError::PaymentRequired(_))
            ));
            assert!(matches!(
                check(&method, Some(AccessStatus::Closed)),
                Err(ApiError::PaymentRequired(_))
            ));
        }
    }

    #[test]
    fn test_paying_and_unowned_families_allowed() {
        for status in [AccessStatus::Trial, AccessStatus::Active, AccessStatus::Lifetime] {
            assert!(check(&Method::POST, Some(status)).is_ok());
        }
        assert!(check(&Method::DELETE, None).is_ok());
    }
}
