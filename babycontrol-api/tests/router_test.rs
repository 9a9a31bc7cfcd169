/// Router tests that need no database
///
/// Everything here is answered by middleware or validation before a query
/// runs: authentication, deployment-mode gating, role checks, webhook
/// signature verification and security headers.

mod common;

use axum::http::{Method, StatusCode};
use babycontrol_shared::auth::jwt::Principal;
use babycontrol_shared::models::caretaker::CaretakerRole;
use common::*;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_family_routes_require_token() {
    let app = offline_app("selfhosted");

    let response = send(&app, request(Method::GET, "/v1/babies", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");

    let body = json_body(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let app = offline_app("selfhosted");

    let response = send(
        &app,
        request(Method::GET, "/v1/feed-logs", Some("not-a-jwt"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unit_catalogue_is_public() {
    let app = offline_app("selfhosted");

    let response = send(&app, request(Method::GET, "/v1/units?activity=temp", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let abbrs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["abbr"].as_str().unwrap())
        .collect();
    assert_eq!(abbrs, vec!["F", "C"]);
}

#[tokio::test]
async fn test_account_routes_hidden_when_self_hosted() {
    let app = offline_app("selfhosted");

    for (method, uri) in [
        (Method::POST, "/v1/accounts/register"),
        (Method::POST, "/v1/accounts/login"),
        (Method::GET, "/v1/accounts/me"),
        (Method::POST, "/v1/stripe/webhook"),
    ] {
        let response = send(&app, request(method, uri, None, Some(json!({})))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_backup_routes_hidden_in_saas() {
    let app = offline_app("saas");
    let token = sys_admin_token();

    let response = send(&app, request(Method::GET, "/v1/admin/backup", Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        request(Method::POST, "/v1/admin/restore", Some(&token), Some(json!({}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backup_requires_sys_admin() {
    let app = offline_app("selfhosted");
    let token = family_token(Uuid::new_v4());

    let response = send(&app, request(Method::GET, "/v1/admin/backup", Some(&token), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_config_requires_sys_admin() {
    let app = offline_app("selfhosted");
    let token = token(
        Principal::Caretaker,
        Some(Uuid::new_v4()),
        Some(CaretakerRole::Admin),
    );

    let response = send(
        &app,
        request(Method::GET, "/v1/admin/app-config", Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_caretaker_creation_requires_family_admin() {
    let app = offline_app("selfhosted");
    let token = token(
        Principal::Caretaker,
        Some(Uuid::new_v4()),
        Some(CaretakerRole::User),
    );

    let response = send(
        &app,
        request(
            Method::POST,
            "/v1/caretakers",
            Some(&token),
            Some(json!({ "login_id": "02", "name": "Grandma", "security_pin": "4321" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_baby_validation_reports_fields() {
    let app = offline_app("selfhosted");
    let token = family_token(Uuid::new_v4());

    let response = send(
        &app,
        request(
            Method::POST,
            "/v1/babies",
            Some(&token),
            Some(json!({
                "first_name": "",
                "last_name": "Smith",
                "birth_date": "2024-03-01",
                "feed_warning_time": "soon"
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await.to_string();
    assert!(body.contains("first_name"));
    assert!(body.contains("feed_warning_time"));
}

#[tokio::test]
async fn test_webhook_rejects_missing_signature() {
    let app = offline_app("saas");

    let response = send(
        &app,
        request(Method::POST, "/v1/stripe/webhook", None, Some(json!({ "id": "evt_1" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_rejects_wrong_secret() {
    let app = offline_app("saas");
    let payload = json!({
        "id": "evt_1",
        "type": "customer.subscription.deleted",
        "data": { "object": {} }
    })
    .to_string();
    let signature = sign_payload(
        payload.as_bytes(),
        "whsec_someone_else",
        chrono::Utc::now().timestamp(),
    );

    let response = send(&app, webhook_request(&payload, &signature)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_rejects_stale_timestamp() {
    let app = offline_app("saas");
    let payload = r#"{"id":"evt_1","type":"invoice.payment_failed","data":{"object":{}}}"#;
    let signature = sign_payload(
        payload.as_bytes(),
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp() - 3600,
    );

    let response = send(&app, webhook_request(payload, &signature)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_rejects_signed_non_event() {
    let app = offline_app("saas");
    let payload = r#"{"hello":"world"}"#;
    let now = chrono::Utc::now().timestamp();
    let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET, now);

    let response = send(&app, webhook_request(payload, &signature)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = offline_app("selfhosted");

    let response = send(&app, request(Method::GET, "/v1/does-not-exist", None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
