//! Call execution configuration.
//!
//! This module defines the transport-facing settings used when dispatching
//! calls: timeout, redirect policy, default content type and user agent.

use crate::config::{get_config, SuiteConfig};
use serde::{Deserialize, Serialize};

/// Configuration for call execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Request timeout in milliseconds.
    ///
    /// Maximum time to wait for a complete response (including connection,
    /// headers, and body download). Defaults to 30 seconds.
    pub timeout_ms: u64,

    /// Whether 3xx responses are followed.
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow.
    pub max_redirects: u32,

    /// Content type synthesized for calls that attach a body but declare no
    /// content type.
    pub default_content_type: String,

    pub user_agent: String,
}

impl ExecutionConfig {
    /// Creates an ExecutionConfig with the given timeout and default settings
    /// otherwise.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_ms: timeout_secs.saturating_mul(1000),
            ..Self::from_suite_config(&SuiteConfig::default())
        }
    }

    /// Derives execution settings from a suite configuration.
    pub fn from_suite_config(config: &SuiteConfig) -> Self {
        Self {
            timeout_ms: config.timeout,
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
            default_content_type: config.default_content_type.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Creates an ExecutionConfig from the global configuration.
    pub fn from_global_config() -> Self {
        Self::from_suite_config(&get_config())
    }

    /// Returns the timeout as a `std::time::Duration`.
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ExecutionConfig {
    /// Reads settings from the global configuration.
    fn default() -> Self {
        Self::from_global_config()
    }
}
