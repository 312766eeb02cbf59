//! Configuration schema for suite execution.
//!
//! This module defines the configuration structure and validation logic for all
//! user-configurable settings.

use crate::variables::{ResolutionMode, DEFAULT_MAX_PASSES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting holds a value outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Main configuration structure.
///
/// All settings can be provided as JSON under the "api-suite" key.
/// Missing settings fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteConfig {
    /// Request timeout in milliseconds.
    ///
    /// Maximum time to wait for a complete response (including connection,
    /// headers, and body download). Defaults to 30000ms (30 seconds).
    ///
    /// Must be greater than 0.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether to automatically follow HTTP redirects. Defaults to true.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow.
    ///
    /// Only used when `follow_redirects` is true. Defaults to 10.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Content type sent with a body when a call declares none.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// How `{{name}}` placeholders are substituted. Defaults to "embedded".
    #[serde(default)]
    pub resolution_mode: ResolutionMode,

    /// Upper bound on substitution passes for one template. Defaults to 10.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_max_resolution_passes")]
    pub max_resolution_passes: usize,

    /// Name of the environment profile file. The file is searched for in the
    /// working directory and up to 3 parent directories.
    #[serde(default = "default_environment_file")]
    pub environment_file: String,

    /// Profile used to seed the environment, overriding the file's own
    /// `$active` selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_environment: Option<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            default_content_type: default_content_type(),
            user_agent: default_user_agent(),
            resolution_mode: ResolutionMode::default(),
            max_resolution_passes: default_max_resolution_passes(),
            environment_file: default_environment_file(),
            active_environment: None,
        }
    }
}

impl SuiteConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::Invalid(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_resolution_passes == 0 {
            return Err(ConfigError::Invalid(
                "maxResolutionPasses must be greater than 0".to_string(),
            ));
        }

        if self.default_content_type.parse::<mime::Mime>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "defaultContentType '{}' is not a valid media type",
                self.default_content_type
            )));
        }

        // max_redirects can be 0 (no redirects), so no validation needed

        Ok(())
    }

    /// Returns the timeout as a `std::time::Duration`.
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout)
    }

    /// Merges this configuration with another, using values from `other` where present.
    pub fn merge(&self, other: &SuiteConfig) -> Self {
        Self {
            timeout: other.timeout,
            follow_redirects: other.follow_redirects,
            max_redirects: other.max_redirects,
            default_content_type: other.default_content_type.clone(),
            user_agent: other.user_agent.clone(),
            resolution_mode: other.resolution_mode,
            max_resolution_passes: other.max_resolution_passes,
            environment_file: other.environment_file.clone(),
            active_environment: other
                .active_environment
                .clone()
                .or_else(|| self.active_environment.clone()),
        }
    }
}

// Default value functions for serde

fn default_timeout() -> u64 {
    30000 // 30 seconds in milliseconds
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> u32 {
    10
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_user_agent() -> String {
    concat!("api-suite/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_resolution_passes() -> usize {
    DEFAULT_MAX_PASSES
}

fn default_environment_file() -> String {
    ".api-suite-env.json".to_string()
}
