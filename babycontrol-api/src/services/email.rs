/// Transactional email.
///
/// The provider is read from the `email_config` row on every send, so a
/// change made through the admin API applies to the next message:
///
/// - `console`: logs the message instead of sending it
/// - `sendgrid`: SendGrid v3 mail API
/// - `smtp2go`: SMTP2GO HTTP API

use babycontrol_shared::models::email_config::{EmailConfig, EmailProvider};
use serde_json::{json, Value};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, error, info};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const SMTP2GO_URL: &str = "https://api.smtp2go.com/v3/email/send";

#[derive(Debug, Error)]
pub enum EmailError {
    /// Selected provider has no API key
    #[error("Email provider '{0}' is not configured")]
    NotConfigured(&'static str),

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
}

#[derive(Clone)]
pub struct EmailService {
    http: reqwest::Client,

    /// Base URL for links in emails
    app_url: String,
}

fn mailbox(name: Option<&str>, email: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{} <{}>", name, email),
        _ => email.to_string(),
    }
}

fn greeting(name: Option<&str>) -> String {
    name.map(|n| format!(" {}", n)).unwrap_or_default()
}

pub(crate) fn sendgrid_body(config: &EmailConfig, message: &EmailMessage) -> Value {
    let mut to = json!({ "email": message.to });
    if let Some(name) = &message.to_name {
        to["name"] = json!(name);
    }

    json!({
        "personalizations": [{ "to": [to] }],
        "from": {
            "email": config.sender_email,
            "name": config.sender_name
        },
        "subject": message.subject,
        "content": [{
            "type": "text/plain",
            "value": message.body_text
        }]
    })
}

pub(crate) fn smtp2go_body(config: &EmailConfig, api_key: &str, message: &EmailMessage) -> Value {
    json!({
        "api_key": api_key,
        "to": [mailbox(message.to_name.as_deref(), &message.to)],
        "sender": mailbox(Some(&config.sender_name), &config.sender_email),
        "subject": message.subject,
        "text_body": message.body_text
    })
}

impl EmailService {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            app_url: app_url.into(),
        }
    }

    /// Sends through the provider currently stored in the database
    pub async fn send(&self, pool: &PgPool, message: EmailMessage) -> Result<(), EmailError> {
        let config = EmailConfig::ensure(pool).await?;
        self.send_with(&config, message).await
    }

    /// Sends through the provider described by `config`
    pub async fn send_with(
        &self,
        config: &EmailConfig,
        message: EmailMessage,
    ) -> Result<(), EmailError> {
        match config.provider() {
            EmailProvider::Console => {
                self.send_console(config, &message);
                Ok(())
            }
            EmailProvider::Sendgrid => self.send_sendgrid(config, &message).await,
            EmailProvider::Smtp2go => self.send_smtp2go(config, &message).await,
        }
    }

    fn send_console(&self, config: &EmailConfig, message: &EmailMessage) {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %config.sender_email,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body");
    }

    async fn send_sendgrid(
        &self,
        config: &EmailConfig,
        message: &EmailMessage,
    ) -> Result<(), EmailError> {
        let api_key = config
            .sendgrid_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(EmailError::NotConfigured("sendgrid"))?;

        let response = self
            .http
            .post(SENDGRID_URL)
            .bearer_auth(api_key)
            .json(&sendgrid_body(config, message))
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        Self::check_response("SendGrid", response, message).await
    }

    async fn send_smtp2go(
        &self,
        config: &EmailConfig,
        message: &EmailMessage,
    ) -> Result<(), EmailError> {
        let api_key = config
            .smtp2go_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(EmailError::NotConfigured("smtp2go"))?;

        let response = self
            .http
            .post(SMTP2GO_URL)
            .json(&smtp2go_body(config, api_key, message))
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SMTP2GO request failed: {}", e)))?;

        Self::check_response("SMTP2GO", response, message).await
    }

    async fn check_response(
        provider: &str,
        response: reqwest::Response,
        message: &EmailMessage,
    ) -> Result<(), EmailError> {
        if response.status().is_success() {
            info!(
                provider = %provider,
                to = %message.to,
                subject = %message.subject,
                "Email sent"
            );
            return Ok(());
        }

        let status = response.status();
        let error_body = response.text().await.unwrap_or_default();
        error!(
            provider = %provider,
            status = %status,
            error = %error_body,
            "Email provider rejected message"
        );
        Err(EmailError::ProviderError(format!(
            "{} returned {}: {}",
            provider, status, error_body
        )))
    }

    pub fn verification_message(&self, to: &str, name: Option<&str>, token: &str) -> EmailMessage {
        let url = format!("{}/account/verify?token={}", self.app_url, token);
        EmailMessage {
            to: to.to_string(),
            to_name: name.map(String::from),
            subject: "Verify your email address - Baby Control".to_string(),
            body_text: format!(
                "Hi{name},\n\nPlease verify your email address by opening the link \
                 below:\n\n{url}\n\n\
                 If you didn't create a Baby Control account, you can ignore this email.\n",
                name = greeting(name),
                url = url
            ),
        }
    }

    pub fn password_reset_message(
        &self,
        to: &str,
        name: Option<&str>,
        token: &str,
    ) -> EmailMessage {
        let url = format!("{}/account/reset-password?token={}", self.app_url, token);
        EmailMessage {
            to: to.to_string(),
            to_name: name.map(String::from),
            subject: "Reset your password - Baby Control".to_string(),
            body_text: format!(
                "Hi{name},\n\nWe received a request to reset your password. Open the link below \
                 to choose a new one:\n\n{url}\n\nThis link expires in 1 hour. If you didn't ask \
                 for a reset, your password stays unchanged.\n",
                name = greeting(name),
                url = url
            ),
        }
    }

    pub fn invite_message(&self, to: &str, token: &str) -> EmailMessage {
        let url = format!("{}/setup/{}", self.app_url, token);
        EmailMessage {
            to: to.to_string(),
            to_name: None,
            subject: "You're invited to set up a family - Baby Control".to_string(),
            body_text: format!(
                "Hi,\n\nYou've been invited to set up a family on Baby Control. Open the link \
                 below to get started:\n\n{url}\n\nThe invitation expires in 7 days.\n",
                url = url
            ),
        }
    }

    pub async fn send_verification_email(
        &self,
        pool: &PgPool,
        to: &str,
        name: Option<&str>,
        token: &str,
    ) -> Result<(), EmailError> {
        self.send(pool, self.verification_message(to, name, token)).await
    }

    pub async fn send_password_reset_email(
        &self,
        pool: &PgPool,
        to: &str,
        name: Option<&str>,
        token: &str,
    ) -> Result<(), EmailError> {
        self.send(pool, self.password_reset_message(to, name, token)).await
    }

    pub async fn send_invite_email(
        &self,
        pool: &PgPool,
        to: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        self.send(pool, self.invite_message(to, token)).await
    }
}
