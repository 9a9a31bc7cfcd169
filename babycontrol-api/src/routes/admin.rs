/// Instance administration (system administrator only)
///
/// # Endpoints
///
/// - `GET/PUT /v1/admin/app-config` - Domain, HTTPS flag, admin password
/// - `GET/PUT /v1/admin/email-config` - Outbound email provider
///
/// Secrets are write-only: responses report whether an API key is set but
/// never return it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use babycontrol_shared::{
    auth::{authorization::require_sys_admin, middleware::AuthContext, password},
    models::{
        app_config::{AppConfig, UpdateAppConfig},
        email_config::{EmailConfig, EmailProvider, UpdateEmailConfig},
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAppConfigRequest {
    pub admin_password: Option<String>,

    #[validate(length(max = 253, message = "Root domain must be at most 253 characters"))]
    pub root_domain: Option<String>,

    pub enable_https: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEmailConfigRequest {
    pub provider_type: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub smtp2go_api_key: Option<String>,

    #[validate(email(message = "Invalid sender email"))]
    pub sender_email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Sender name must be 1-100 characters"))]
    pub sender_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailConfigResponse {
    #[serde(flatten)]
    pub config: EmailConfig,

    pub has_sendgrid_key: bool,
    pub has_smtp2go_key: bool,
}

impl From<EmailConfig> for EmailConfigResponse {
    fn from(config: EmailConfig) -> Self {
        Self {
            has_sendgrid_key: config.has_sendgrid_key(),
            has_smtp2go_key: config.has_smtp2go_key(),
            config,
        }
    }
}

async fn load_app_config(state: &AppState) -> ApiResult<AppConfig> {
    AppConfig::get(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("App config not found".to_string()))
}

pub async fn get_app_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AppConfig>> {
    require_sys_admin(&auth)?;

    Ok(Json(load_app_config(&state).await?))
}

/// Updates instance configuration
///
/// # Errors
///
/// - `403 Forbidden`: Not the system administrator
/// - `422 Unprocessable Entity`: New admin password too weak
pub async fn update_app_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateAppConfigRequest>,
) -> ApiResult<Json<AppConfig>> {
    require_sys_admin(&auth)?;
    req.validate()?;

    let admin_pass_hash = match req.admin_password.as_deref() {
        Some(new_password) => {
            password::validate_password_strength(new_password)
                .map_err(|message| ApiError::invalid_field("admin_password", message))?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };
    let password_changed = admin_pass_hash.is_some();

    let current = load_app_config(&state).await?;
    let config = AppConfig::update(
        &state.db,
        current.id,
        UpdateAppConfig {
            admin_pass_hash,
            root_domain: req.root_domain,
            enable_https: req.enable_https,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("App config not found".to_string()))?;

    info!(password_changed, "App config updated");

    Ok(Json(config))
}

pub async fn get_email_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<EmailConfigResponse>> {
    require_sys_admin(&auth)?;

    Ok(Json(EmailConfig::ensure(&state.db).await?.into()))
}

pub async fn update_email_config(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateEmailConfigRequest>,
) -> ApiResult<Json<EmailConfigResponse>> {
    require_sys_admin(&auth)?;
    req.validate()?;

    let provider_type = req
        .provider_type
        .as_deref()
        .map(|raw| {
            EmailProvider::from_str(raw).ok_or_else(|| {
                ApiError::invalid_field(
                    "provider_type",
                    "Provider must be one of console, sendgrid, smtp2go",
                )
            })
        })
        .transpose()?;

    let current = EmailConfig::ensure(&state.db).await?;
    let config = EmailConfig::update(
        &state.db,
        current.id,
        UpdateEmailConfig {
            provider_type,
            sendgrid_api_key: req.sendgrid_api_key,
            smtp2go_api_key: req.smtp2go_api_key,
            sender_email: req.sender_email,
            sender_name: req.sender_name,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Email config not found".to_string()))?;

    info!(provider = config.provider().as_str(), "Email config updated");

    Ok(Json(config.into()))
}
