/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use babycontrol_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = babycontrol_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{deployment, security::SecurityHeadersLayer, write_gate},
    services::email::EmailService,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use babycontrol_shared::auth::lockout::LoginLockout;
use babycontrol_shared::auth::middleware::authenticate_headers;
use babycontrol_shared::models::{
    bath_log::BathLog, diaper_log::DiaperLog, feed_log::FeedLog, measurement::Measurement,
    medicine_log::MedicineLog, milestone::Milestone, note::Note, pump_log::PumpLog,
    sleep_log::SleepLog,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Restore uploads carry the whole database
const RESTORE_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    pub email: EmailService,

    /// Failed PIN/password login tracking
    pub lockout: Arc<LoginLockout>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let email = EmailService::new(config.api.app_url.clone());

        Self {
            db,
            config: Arc::new(config),
            email,
            lockout: Arc::new(LoginLockout::default()),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health                              public
/// /v1/auth/{login,refresh,admin}       public
/// /v1/auth/me                          bearer
/// /v1/families/{slug-check,by-slug}    public
/// /v1/family-setup/invites/:token      public
/// /v1/family-setup/complete            public
/// /v1/units                            public
/// /v1/accounts/...                     SaaS only; register/login/verify/reset public
/// /v1/stripe/webhook                   SaaS only; Stripe signature
/// /v1/admin/{backup,restore}           self-hosted only; system administrator
/// everything else under /v1            bearer, plus the write gate on family data
/// ```
///
/// # Middleware Stack
///
/// Applied outermost first: security headers, CORS, compression, tracing,
/// then per-group deployment gating, bearer authentication and the write gate.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{self, logs};

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let bearer = || from_fn_with_state(state.clone(), jwt_auth_layer);
    let gate = || from_fn_with_state(state.clone(), write_gate::write_gate_layer);

    let public_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/admin", post(routes::auth::admin_login))
        .route("/families/slug-check/:slug", get(routes::families::slug_check))
        .route("/families/by-slug/:slug", get(routes::families::get_by_slug))
        .route("/family-setup/invites/:token", get(routes::family_setup::check_invite))
        .route("/family-setup/complete", post(routes::family_setup::complete))
        .route("/units", get(routes::settings::list_units));

    let account_public_routes = Router::new()
        .route("/accounts/register", post(routes::accounts::register))
        .route("/accounts/login", post(routes::accounts::login))
        .route("/accounts/verify", get(routes::accounts::verify))
        .route("/accounts/password-reset", post(routes::accounts::request_password_reset))
        .route(
            "/accounts/password-reset/confirm",
            post(routes::accounts::confirm_password_reset),
        )
        .route("/stripe/webhook", post(routes::stripe::webhook))
        .layer(from_fn_with_state(state.clone(), deployment::require_accounts));

    let account_routes = Router::new()
        .route("/accounts/me", get(routes::accounts::me))
        .route("/accounts/family", post(routes::accounts::create_family))
        .route("/accounts/close", post(routes::accounts::close))
        .layer(bearer())
        .layer(from_fn_with_state(state.clone(), deployment::require_accounts));

    let backup_routes = Router::new()
        .route("/admin/backup", get(routes::backup::download))
        .route(
            "/admin/restore",
            post(routes::backup::restore).layer(DefaultBodyLimit::max(RESTORE_BODY_LIMIT)),
        )
        .layer(bearer())
        .layer(from_fn_with_state(state.clone(), deployment::require_backup));

    let admin_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/families", get(routes::families::list))
        .route("/families/:id", put(routes::families::update_by_id))
        .route(
            "/family-setup/invites",
            post(routes::family_setup::create_invite).get(routes::family_setup::list_invites),
        )
        .route(
            "/admin/app-config",
            get(routes::admin::get_app_config).put(routes::admin::update_app_config),
        )
        .route(
            "/admin/email-config",
            get(routes::admin::get_email_config).put(routes::admin::update_email_config),
        )
        .layer(bearer());

    let family_routes = Router::new()
        .route(
            "/family",
            get(routes::families::get_current).put(routes::families::update_current),
        )
        .route(
            "/caretakers",
            get(routes::caretakers::list).post(routes::caretakers::create),
        )
        .route(
            "/caretakers/:id",
            get(routes::caretakers::get)
                .put(routes::caretakers::update)
                .delete(routes::caretakers::delete),
        )
        .route("/babies", get(routes::babies::list).post(routes::babies::create))
        .route(
            "/babies/:id",
            get(routes::babies::get)
                .put(routes::babies::update)
                .delete(routes::babies::delete),
        )
        .route("/babies/:id/status", get(routes::babies::status))
        .route("/babies/:id/timeline", get(routes::babies::timeline))
        .route(
            "/medicines",
            get(routes::medicines::list).post(routes::medicines::create),
        )
        .route(
            "/medicines/:id",
            get(routes::medicines::get)
                .put(routes::medicines::update)
                .delete(routes::medicines::delete),
        )
        .route(
            "/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route(
            "/settings/activities",
            get(routes::settings::get_activity_settings)
                .put(routes::settings::update_activity_settings),
        )
        .merge(log_routes::<SleepLog>(
            "sleep-logs",
            post(logs::sleep::create),
            put(logs::sleep::update),
        ))
        .merge(log_routes::<FeedLog>(
            "feed-logs",
            post(logs::feed::create),
            put(logs::feed::update),
        ))
        .merge(log_routes::<DiaperLog>(
            "diaper-logs",
            post(logs::diaper::create),
            put(logs::diaper::update),
        ))
        .merge(log_routes::<BathLog>(
            "bath-logs",
            post(logs::bath::create),
            put(logs::bath::update),
        ))
        .merge(log_routes::<PumpLog>(
            "pump-logs",
            post(logs::pump::create),
            put(logs::pump::update),
        ))
        .merge(log_routes::<Note>("notes", post(logs::note::create), put(logs::note::update)))
        .merge(log_routes::<Milestone>(
            "milestones",
            post(logs::milestone::create),
            put(logs::milestone::update),
        ))
        .merge(log_routes::<Measurement>(
            "measurements",
            post(logs::measurement::create),
            put(logs::measurement::update),
        ))
        .merge(log_routes::<MedicineLog>(
            "medicine-logs",
            post(logs::medicine::create),
            put(logs::medicine::update),
        ))
        .layer(gate())
        .layer(bearer());

    let v1_routes = Router::new()
        .merge(public_routes)
        .merge(account_public_routes)
        .merge(account_routes)
        .merge(backup_routes)
        .merge(admin_routes)
        .merge(family_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// List/get/delete are shared by every log kind; create and update are per kind
fn log_routes<T>(
    path: &str,
    create: axum::routing::MethodRouter<AppState>,
    update: axum::routing::MethodRouter<AppState>,
) -> Router<AppState>
where
    T: babycontrol_shared::models::activity_log::ActivityLog + Sync + 'static,
{
    use crate::routes::logs;

    Router::new()
        .route(&format!("/{}", path), get(logs::list::<T>).merge(create))
        .route(
            &format!("/{}/:id", path),
            get(logs::get::<T>).delete(logs::delete::<T>).merge(update),
        )
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token and injects `AuthContext` into request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate_headers(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
