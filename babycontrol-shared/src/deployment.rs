/// Deployment mode.
///
/// A self-hosted install serves one household (or a handful) with no billing.
/// The SaaS install adds accounts, Stripe billing and the write gate, and
/// drops whole-database backup/restore.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    SelfHosted,
    Saas,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::SelfHosted => "selfhosted",
            DeploymentMode::Saas => "saas",
        }
    }

    pub fn is_saas(&self) -> bool {
        matches!(self, DeploymentMode::Saas)
    }

    /// Account and Stripe routes
    pub fn accounts_enabled(&self) -> bool {
        self.is_saas()
    }

    /// Backup download and restore upload
    pub fn backup_enabled(&self) -> bool {
        !self.is_saas()
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown deployment mode '{0}', expected 'selfhosted' or 'saas'")]
pub struct UnknownDeploymentMode(pub String);

impl FromStr for DeploymentMode {
    type Err = UnknownDeploymentMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selfhosted" | "self-hosted" | "self_hosted" => Ok(DeploymentMode::SelfHosted),
            "saas" => Ok(DeploymentMode::Saas),
            other => Err(UnknownDeploymentMode(other.to_string())),
        }
    }
}
