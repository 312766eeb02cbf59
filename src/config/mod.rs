//! Configuration management.
//!
//! This module provides configuration loading, validation, and access through a singleton pattern.
//! Configuration is read from a JSON settings value under the "api-suite" key, or from a
//! JSON file, and merged with defaults.

pub mod schema;

pub use schema::{ConfigError, SuiteConfig};

use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::Path;
use std::sync::RwLock;

/// Key under which settings are looked up in a settings document.
pub const SETTINGS_KEY: &str = "api-suite";

/// Global configuration instance.
///
/// This is lazily initialized on first access and can be updated when settings change.
static CONFIG: Lazy<RwLock<SuiteConfig>> = Lazy::new(|| RwLock::new(SuiteConfig::default()));

/// Loads configuration from a settings JSON value.
///
/// This function reads the "api-suite" settings, merges them with defaults,
/// validates the result, and updates the global configuration. Settings that
/// fail to deserialize are logged and ignored.
///
/// # Example
///
/// ```
/// use api_suite::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "api-suite": {
///         "timeout": 60000,
///         "followRedirects": false
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.timeout, 60000);
/// # api_suite::config::reset_config();
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<SuiteConfig, ConfigError> {
    let mut config = SuiteConfig::default();

    if let Some(suite_settings) = settings_json.as_ref().and_then(|s| s.get(SETTINGS_KEY)) {
        match serde_json::from_value::<SuiteConfig>(suite_settings.clone()) {
            Ok(user_config) => {
                config = config.merge(&user_config);
            }
            Err(e) => {
                log::warn!(
                    "failed to parse {} settings: {}. Using defaults.",
                    SETTINGS_KEY,
                    e
                );
            }
        }
    }

    install(config)
}

/// Loads configuration from a JSON file holding the settings object itself
/// (no "api-suite" wrapper).
///
/// # Errors
///
/// Unlike [`load_config`], a file that cannot be read or parsed is an error.
pub fn load_config_file(path: &Path) -> Result<SuiteConfig, ConfigError> {
    log::debug!("loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let user_config: SuiteConfig = serde_json::from_str(&content)?;
    install(SuiteConfig::default().merge(&user_config))
}

fn install(config: SuiteConfig) -> Result<SuiteConfig, ConfigError> {
    config.validate()?;

    if let Ok(mut global_config) = CONFIG.write() {
        *global_config = config.clone();
    }

    Ok(config)
}

/// Gets the current global configuration.
///
/// Returns a clone of the current configuration, or the defaults if nothing
/// has been loaded yet.
pub fn get_config() -> SuiteConfig {
    CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_else(|_| SuiteConfig::default())
}

/// Updates the global configuration in place.
///
/// If the result fails validation the configuration is reset to defaults.
///
/// # Example
///
/// ```
/// use api_suite::config::{get_config, reset_config, update_config};
///
/// update_config(|config| {
///     config.timeout = 60000;
/// });
/// assert_eq!(get_config().timeout, 60000);
/// # reset_config();
/// ```
pub fn update_config<F>(updater: F)
where
    F: FnOnce(&mut SuiteConfig),
{
    if let Ok(mut config) = CONFIG.write() {
        updater(&mut config);

        if let Err(e) = config.validate() {
            log::warn!("configuration rejected after update: {}", e);
            *config = SuiteConfig::default();
        }
    }
}

/// Resets the configuration to defaults.
pub fn reset_config() {
    if let Ok(mut config) = CONFIG.write() {
        *config = SuiteConfig::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::ResolutionMode;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.timeout, 30000);
        assert_eq!(config.max_resolution_passes, 10);
        reset_config();
    }

    #[test]
    #[serial]
    fn test_load_config_partial_settings() {
        let settings = json!({
            "api-suite": {
                "timeout": 45000,
                "resolutionMode": "whole-match"
            }
        });

        let config = load_config(Some(settings)).unwrap();
        assert_eq!(config.timeout, 45000);
        assert_eq!(config.resolution_mode, ResolutionMode::WholeMatch);
        assert_eq!(config.max_redirects, 10);
        reset_config();
    }

    #[test]
    #[serial]
    fn test_load_config_invalid_json_falls_back() {
        let settings = json!({
            "api-suite": {
                "timeout": "not-a-number"
            }
        });

        let config = load_config(Some(settings)).unwrap();
        assert_eq!(config.timeout, 30000);
        reset_config();
    }

    #[test]
    #[serial]
    fn test_load_config_validation_error() {
        let settings = json!({
            "api-suite": {
                "maxResolutionPasses": 0
            }
        });

        let err = load_config(Some(settings)).unwrap_err();
        assert!(err
            .to_string()
            .contains("maxResolutionPasses must be greater than 0"));
        reset_config();
    }

    #[test]
    #[serial]
    fn test_no_settings_key() {
        let settings = json!({
            "other-tool": {
                "timeout": 1
            }
        });

        let config = load_config(Some(settings)).unwrap();
        assert_eq!(config.timeout, 30000);
        reset_config();
    }

    #[test]
    #[serial]
    fn test_get_config_reflects_load() {
        reset_config();
        assert_eq!(get_config().timeout, 30000);

        load_config(Some(json!({ "api-suite": { "timeout": 90000 } }))).unwrap();
        assert_eq!(get_config().timeout, 90000);

        reset_config();
        assert_eq!(get_config().timeout, 30000);
    }

    #[test]
    #[serial]
    fn test_update_config() {
        reset_config();

        update_config(|config| {
            config.user_agent = "suite-test".to_string();
            config.follow_redirects = false;
        });

        let config = get_config();
        assert_eq!(config.user_agent, "suite-test");
        assert!(!config.follow_redirects);

        reset_config();
    }

    #[test]
    #[serial]
    fn test_update_config_with_invalid_value() {
        reset_config();

        update_config(|config| {
            config.timeout = 0;
        });

        assert_eq!(get_config().timeout, 30000);
        reset_config();
    }

    #[test]
    #[serial]
    fn test_load_config_file() {
        use std::io::Write;

        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "timeout": 1500, "activeEnvironment": "staging" }}"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.timeout, 1500);
        assert_eq!(config.active_environment.as_deref(), Some("staging"));
        assert_eq!(get_config().timeout, 1500);

        reset_config();
    }

    #[test]
    #[serial]
    fn test_load_config_file_parse_error() {
        use std::io::Write;

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            load_config_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
