/// Integration tests for the Baby Control API
///
/// These run against PostgreSQL and are skipped when `DATABASE_URL` is not
/// set. They cover:
/// - Family PIN login
/// - Baby and activity log lifecycle
/// - Status and timeline
/// - Family isolation
/// - Activity tile settings
/// - Login lockout, caretaker admin rules and refresh revalidation
/// - The SaaS payment write gate
/// - Backup and restore

mod common;

use axum::http::{header, Method};
use babycontrol_shared::models::account::Account;
use chrono::{Duration, Utc};
use common::*;
use serde_json::{json, Value};

#[tokio::test]
async fn test_family_pin_login() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let login = |pin: &str| {
        request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "family_slug": ctx.family.slug, "security_pin": pin })),
        )
    };

    let response = send(&ctx.app, login(FAMILY_PIN)).await;
    assert_eq!(response.status().as_u16(), 200);
    let body = json_body(response).await;
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["family"]["slug"], ctx.family.slug.as_str());

    let response = send(&ctx.app, login("000000")).await;
    assert_eq!(response.status().as_u16(), 401);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_baby_and_feed_log_lifecycle() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let (status, baby) = ctx
        .call(
            Method::POST,
            "/v1/babies",
            Some(json!({
                "first_name": "Ada",
                "last_name": "Smith",
                "birth_date": "2024-03-01",
                "feed_warning_time": "02:00"
            })),
        )
        .await;
    assert_eq!(status, 201, "{}", baby);
    let baby_id = baby["id"].as_str().unwrap().to_string();

    let fed_at = Utc::now() - Duration::hours(3);
    let (status, feed) = ctx
        .call(
            Method::POST,
            "/v1/feed-logs",
            Some(json!({
                "baby_id": baby_id,
                "time": fed_at,
                "feed_type": "bottle",
                "amount": 4.0,
                "unit_abbr": "OZ"
            })),
        )
        .await;
    assert_eq!(status, 201, "{}", feed);
    let feed_id = feed["id"].as_str().unwrap().to_string();

    // Breast feeds need a side
    let (status, _) = ctx
        .call(
            Method::POST,
            "/v1/feed-logs",
            Some(json!({ "baby_id": baby_id, "time": Utc::now(), "feed_type": "breast" })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, updated) = ctx
        .call(
            Method::PUT,
            &format!("/v1/feed-logs/{}", feed_id),
            Some(json!({ "amount": 5.0 })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(updated["amount"], 5.0);
    assert_eq!(updated["unit_abbr"], "OZ");

    let (status, list) = ctx
        .call(Method::GET, &format!("/v1/feed-logs?baby_id={}", baby_id), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, baby_status) = ctx
        .call(Method::GET, &format!("/v1/babies/{}/status", baby_id), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(baby_status["feed_warning"], true);
    assert!(baby_status["minutes_since_feed"].as_i64().unwrap() >= 179);

    let (status, _) = ctx
        .call(
            Method::POST,
            "/v1/diaper-logs",
            Some(json!({ "baby_id": baby_id, "time": Utc::now(), "diaper_type": "wet" })),
        )
        .await;
    assert_eq!(status, 201);

    let (status, timeline) = ctx
        .call(Method::GET, &format!("/v1/babies/{}/timeline", baby_id), None)
        .await;
    assert_eq!(status, 200);
    let kinds: Vec<&str> = timeline
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["diaper", "feed"]);

    let (status, _) = ctx
        .call(Method::DELETE, &format!("/v1/feed-logs/{}", feed_id), None)
        .await;
    assert_eq!(status, 204);

    let (status, _) = ctx
        .call(Method::GET, &format!("/v1/feed-logs/{}", feed_id), None)
        .await;
    assert_eq!(status, 404);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_families_are_isolated() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let (status, baby) = ctx
        .call(
            Method::POST,
            "/v1/babies",
            Some(json!({ "first_name": "Ada", "last_name": "Smith", "birth_date": "2024-03-01" })),
        )
        .await;
    assert_eq!(status, 201);
    let baby_id = baby["id"].as_str().unwrap();

    let other = create_family(&ctx.db).await;
    let other_token = family_token(other.id);

    let response = send(
        &ctx.app,
        request(
            Method::GET,
            &format!("/v1/babies/{}", baby_id),
            Some(&other_token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);

    let response = send(
        &ctx.app,
        request(
            Method::POST,
            "/v1/sleep-logs",
            Some(&other_token),
            Some(json!({ "baby_id": baby_id, "start_time": Utc::now(), "sleep_type": "nap" })),
        ),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);

    delete_family(&ctx.db, other.id).await;
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_activity_settings_family_default() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let (status, initial) = ctx.call(Method::GET, "/v1/settings/activities", None).await;
    assert_eq!(status, 200);
    assert_eq!(initial["source"], "default");
    assert_eq!(initial["order"][0], "sleep");

    // The family login has no caretaker, so only the family scope applies
    let (status, _) = ctx
        .call(
            Method::PUT,
            "/v1/settings/activities",
            Some(json!({ "order": ["feed"] })),
        )
        .await;
    assert_eq!(status, 422);

    let (status, saved) = ctx
        .call(
            Method::PUT,
            "/v1/settings/activities",
            Some(json!({ "order": ["feed", "diaper"], "visible": ["feed"], "scope": "family" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(saved["order"][0], "feed");
    assert_eq!(saved["order"].as_array().unwrap().len(), 9);
    assert_eq!(saved["visible"], json!(["feed"]));

    let (_, effective) = ctx.call(Method::GET, "/v1/settings/activities", None).await;
    assert_eq!(effective["source"], "family");

    let (status, _) = ctx
        .call(
            Method::PUT,
            "/v1/settings/activities",
            Some(json!({ "order": ["tummy_time"], "scope": "family" })),
        )
        .await;
    assert_eq!(status, 422);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_health_reports_database() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let response = send(&ctx.app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(response.status().as_u16(), 200);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["deployment"], "selfhosted");

    ctx.cleanup().await;
}

fn pin_login(
    slug: &str,
    login_id: Option<&str>,
    pin: &str,
) -> axum::http::Request<axum::body::Body> {
    let mut body = json!({ "family_slug": slug, "security_pin": pin });
    if let Some(login_id) = login_id {
        body["login_id"] = json!(login_id);
    }
    request(Method::POST, "/v1/auth/login", None, Some(body))
}

async fn add_caretaker(ctx: &TestContext, token: &str, login_id: &str, role: &str) -> Value {
    let (status, caretaker) = ctx
        .call_as(
            token,
            Method::POST,
            "/v1/caretakers",
            Some(json!({
                "login_id": login_id,
                "name": format!("Caretaker {}", login_id),
                "role": role,
                "security_pin": "1234"
            })),
        )
        .await;
    assert_eq!(status, 201, "{}", caretaker);
    caretaker
}

async fn caretaker_tokens(ctx: &TestContext, login_id: &str) -> Value {
    let response = send(&ctx.app, pin_login(&ctx.family.slug, Some(login_id), "1234")).await;
    assert_eq!(response.status().as_u16(), 200);
    json_body(response).await
}

#[tokio::test]
async fn test_login_locks_after_three_failures() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    for _ in 0..2 {
        let response = send(&ctx.app, pin_login(&ctx.family.slug, None, "000000")).await;
        assert_eq!(response.status().as_u16(), 401);
    }

    let response = send(&ctx.app, pin_login(&ctx.family.slug, None, "000000")).await;
    assert_eq!(response.status().as_u16(), 429);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 300);

    // Locked even with the right PIN, and the slug's case does not matter
    let response = send(&ctx.app, pin_login(&ctx.family.slug, None, FAMILY_PIN)).await;
    assert_eq!(response.status().as_u16(), 429);
    let shouted = ctx.family.slug.to_uppercase();
    let response = send(&ctx.app, pin_login(&shouted, None, FAMILY_PIN)).await;
    assert_eq!(response.status().as_u16(), 429);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_last_admin_cannot_be_removed() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    // The first caretaker is an admin whatever was requested
    let first = add_caretaker(&ctx, &ctx.token, "01", "user").await;
    assert_eq!(first["role"], "admin");
    let first_uri = format!("/v1/caretakers/{}", first["id"].as_str().unwrap());

    let admin = caretaker_tokens(&ctx, "01").await;
    let admin_token = admin["access_token"].as_str().unwrap();

    let (status, _) = ctx
        .call_as(admin_token, Method::PUT, &first_uri, Some(json!({ "role": "user" })))
        .await;
    assert_eq!(status, 409);

    let (status, _) = ctx
        .call_as(admin_token, Method::PUT, &first_uri, Some(json!({ "inactive": true })))
        .await;
    assert_eq!(status, 409);

    let (status, _) = ctx.call_as(admin_token, Method::DELETE, &first_uri, None).await;
    assert_eq!(status, 409);

    // With a second admin the first may step down
    let second = add_caretaker(&ctx, admin_token, "02", "user").await;
    assert_eq!(second["role"], "user");
    let second_uri = format!("/v1/caretakers/{}", second["id"].as_str().unwrap());

    let (status, _) = ctx
        .call_as(admin_token, Method::PUT, &second_uri, Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, 200);

    let (status, demoted) = ctx
        .call_as(admin_token, Method::PUT, &first_uri, Some(json!({ "role": "user" })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(demoted["role"], "user");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_refresh_rereads_identity() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let family_session = send(&ctx.app, pin_login(&ctx.family.slug, None, FAMILY_PIN)).await;
    assert_eq!(family_session.status().as_u16(), 200);
    let family_session = json_body(family_session).await;

    add_caretaker(&ctx, &ctx.token, "01", "admin").await;
    let helper = add_caretaker(&ctx, &ctx.token, "02", "user").await;
    let helper_session = caretaker_tokens(&ctx, "02").await;

    let refresh = |session: &Value| {
        request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": session["refresh_token"] })),
        )
    };

    let response = send(&ctx.app, refresh(&helper_session)).await;
    assert_eq!(response.status().as_u16(), 200);

    // Family PIN sessions end once caretakers exist
    let response = send(&ctx.app, refresh(&family_session)).await;
    assert_eq!(response.status().as_u16(), 401);

    let admin = caretaker_tokens(&ctx, "01").await;
    let (status, _) = ctx
        .call_as(
            admin["access_token"].as_str().unwrap(),
            Method::PUT,
            &format!("/v1/caretakers/{}", helper["id"].as_str().unwrap()),
            Some(json!({ "inactive": true })),
        )
        .await;
    assert_eq!(status, 200);

    let response = send(&ctx.app, refresh(&helper_session)).await;
    assert_eq!(response.status().as_u16(), 403);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_write_gate_follows_account_status() {
    let Some(ctx) = TestContext::saas().await else {
        return;
    };

    let new_baby = || {
        json!({ "first_name": "Ada", "last_name": "Smith", "birth_date": "2024-03-01" })
    };

    let account = ctx.attach_account(Utc::now() - Duration::days(1)).await;

    let (status, body) = ctx.call(Method::POST, "/v1/babies", Some(new_baby())).await;
    assert_eq!(status, 402, "{}", body);

    let (status, _) = ctx.call(Method::GET, "/v1/babies", None).await;
    assert_eq!(status, 200);

    sqlx::query("UPDATE accounts SET trial_ends = $2 WHERE id = $1")
        .bind(account.id)
        .bind(Utc::now() + Duration::days(14))
        .execute(&ctx.db)
        .await
        .unwrap();

    let (status, _) = ctx.call(Method::POST, "/v1/babies", Some(new_baby())).await;
    assert_eq!(status, 201);

    Account::close(&ctx.db, account.id).await.unwrap();

    let (status, _) = ctx.call(Method::POST, "/v1/babies", Some(new_baby())).await;
    assert_eq!(status, 402);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_backup_restore_round_trip() {
    let Some(ctx) = TestContext::exclusive().await else {
        return;
    };
    let admin = sys_admin_token();

    let (status, baby) = ctx
        .call(
            Method::POST,
            "/v1/babies",
            Some(json!({ "first_name": "Ada", "last_name": "Smith", "birth_date": "2024-03-01" })),
        )
        .await;
    assert_eq!(status, 201);
    let baby_uri = format!("/v1/babies/{}", baby["id"].as_str().unwrap());

    let response = send(
        &ctx.app,
        request(Method::GET, "/v1/admin/backup", Some(&admin), None),
    )
    .await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));
    let snapshot = json_body(response).await;

    let (status, _) = ctx.call(Method::DELETE, &baby_uri, None).await;
    assert_eq!(status, 204);
    let (status, _) = ctx.call(Method::GET, &baby_uri, None).await;
    assert_eq!(status, 404);

    let (status, restored) = ctx
        .call_as(&admin, Method::POST, "/v1/admin/restore", Some(snapshot))
        .await;
    assert_eq!(status, 200, "{}", restored);
    assert_eq!(restored["restored"], true);
    assert!(restored["row_counts"]["babies"].as_u64().unwrap() >= 1);

    let (status, back) = ctx.call(Method::GET, &baby_uri, None).await;
    assert_eq!(status, 200);
    assert_eq!(back["first_name"], "Ada");

    ctx.cleanup().await;
}
