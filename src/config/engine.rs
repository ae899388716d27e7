//! Change engine configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Application environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Engine configuration (timeouts, trial defaults, logging)
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Environment name
    #[serde(default)]
    pub environment: Environment,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deadline for read-only gateway calls made while previewing
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Deadline for the single mutating gateway call of a commit
    #[serde(default = "default_commit_timeout")]
    pub commit_timeout_secs: u64,

    /// Trial length offered to new subscribers when the offer sets none
    #[serde(default = "default_trial_days")]
    pub default_trial_days: u32,
}

impl EngineConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.commit_timeout_secs == 0 || self.commit_timeout_secs > 300 {
            return Err(ValidationError::InvalidCommitTimeout);
        }
        if self.default_trial_days > 730 {
            return Err(ValidationError::TrialTooLong);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log_level: default_log_level(),
            gateway_timeout_secs: default_gateway_timeout(),
            commit_timeout_secs: default_commit_timeout(),
            default_trial_days: default_trial_days(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_commit_timeout() -> u64 {
    30
}

fn default_trial_days() -> u32 {
    14
}
