/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
/// - `DEPLOYMENT_MODE`: `selfhosted` (default) or `saas`
/// - `STRIPE_WEBHOOK_SECRET`: Webhook signing secret (required in SaaS mode)
/// - `STRIPE_SECRET_KEY`: Stripe API key (optional)
/// - `CORS_ORIGINS`: Comma-separated origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `APP_URL`: Base URL used in email links (default: http://localhost:3000)
/// - `TRIAL_DAYS`: Trial length for new accounts (default: 14)
/// - `ADMIN_PASSWORD`: Seeds the system administrator password on first start
/// - `LOG_FORMAT`: `pretty` (default) or `json`
///
/// # Example
///
/// ```no_run
/// use babycontrol_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use babycontrol_shared::deployment::DeploymentMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub deployment: DeploymentConfig,
    pub stripe: StripeConfig,
    pub logging: LoggingConfig,

    /// Initial system administrator password; only used to seed `app_config`
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode adds HSTS
    pub production: bool,

    /// Public URL of the web app, used for links in emails
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub mode: DeploymentMode,

    /// Trial length granted to new accounts
    pub trial_days: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StripeConfig {
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,

    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let mode = match var("DEPLOYMENT_MODE") {
            Some(raw) => DeploymentMode::from_str(&raw)?,
            None => DeploymentMode::default(),
        };

        let webhook_secret = var("STRIPE_WEBHOOK_SECRET");
        if mode.is_saas() && webhook_secret.is_none() {
            anyhow::bail!("STRIPE_WEBHOOK_SECRET is required when DEPLOYMENT_MODE=saas");
        }

        let trial_days = var("TRIAL_DAYS")
            .unwrap_or_else(|| "14".to_string())
            .parse::<i64>()?;
        if trial_days < 0 {
            anyhow::bail!("TRIAL_DAYS must not be negative");
        }

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let format = match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                anyhow::bail!("Unknown LOG_FORMAT '{}', expected 'pretty' or 'json'", other)
            }
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production: var("PRODUCTION").is_some_and(|v| parse_bool(&v)),
                app_url: var("APP_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            deployment: DeploymentConfig { mode, trial_days },
            stripe: StripeConfig {
                webhook_secret,
                secret_key: var("STRIPE_SECRET_KEY"),
            },
            logging: LoggingConfig { format },
            admin_password: var("ADMIN_PASSWORD"),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.deployment.mode, DeploymentMode::SelfHosted);
        assert_eq!(config.deployment.trial_days, 14);
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert!(!config.api.production);
        assert_eq!(config.api.app_url, "http://localhost:3000");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn test_required_variables() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "postgresql://localhost/test")]).is_err());
        assert!(load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", "too-short"),
        ])
        .is_err());
    }

    #[test]
    fn test_saas_requires_webhook_secret() {
        let base = [
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("DEPLOYMENT_MODE", "saas"),
        ];
        assert!(load(&base).is_err());

        let mut with_secret = base.to_vec();
        with_secret.push(("STRIPE_WEBHOOK_SECRET", "whsec_test"));
        let config = load(&with_secret).unwrap();
        assert!(config.deployment.mode.is_saas());
        assert_eq!(config.stripe.webhook_secret.as_deref(), Some("whsec_test"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3001"),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("PRODUCTION", "true"),
            ("APP_URL", "https://app.example/"),
            ("LOG_FORMAT", "JSON"),
            ("TRIAL_DAYS", "30"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3001");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config.api.production);
        assert_eq!(config.api.app_url, "https://app.example");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.deployment.trial_days, 30);
    }

    #[test]
    fn test_invalid_values() {
        let base = [
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ];

        for (key, value) in [
            ("API_PORT", "eighty"),
            ("DEPLOYMENT_MODE", "cloud"),
            ("LOG_FORMAT", "xml"),
            ("TRIAL_DAYS", "-1"),
        ] {
            let mut vars = base.to_vec();
            vars.push((key, value));
            assert!(load(&vars).is_err(), "{}={} should be rejected", key, value);
        }
    }
}
