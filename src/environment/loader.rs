//! Environment file loader
//!
//! Loads environment profiles used to seed a suite's environment. The loader
//! searches for `.api-suite-env.json` or `api-suite.env.json` starting from a
//! directory and walking up to 3 parent directories.
//!
//! ```json
//! {
//!   "$shared": { "apiVersion": "v1" },
//!   "$active": "dev",
//!   "dev":  { "baseUrl": "http://localhost:3000" },
//!   "prod": { "baseUrl": "https://api.example.com" }
//! }
//! ```

use super::models::{EnvironmentProfile, EnvironmentProfiles};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading environment profiles
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to parse JSON content
    #[error("failed to parse environment file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid structure in the environment file
    #[error("invalid environment format: {0}")]
    InvalidFormat(String),

    /// The requested profile is not defined
    #[error("environment profile '{0}' not found")]
    UnknownProfile(String),

    /// IO error while reading the file
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Supported environment file names in order of preference
pub const ENV_FILE_NAMES: &[&str] = &[".api-suite-env.json", "api-suite.env.json"];

/// Maximum number of parent directories to search
const MAX_PARENT_SEARCH_DEPTH: usize = 3;

/// Loads environment profiles starting the search at `start_dir`.
///
/// Returns empty profiles when no file is found.
///
/// # Errors
///
/// Returns a [`LoadError`] if a file exists but cannot be read or parsed.
pub fn load_profiles(start_dir: &Path) -> Result<EnvironmentProfiles, LoadError> {
    let env_file = match find_environment_file(start_dir) {
        Some(path) => path,
        None => {
            log::debug!(
                "no environment file found from {}, using empty profiles",
                start_dir.display()
            );
            return Ok(EnvironmentProfiles::new());
        }
    };

    load_profiles_file(&env_file)
}

/// Loads environment profiles from an explicit file path.
pub fn load_profiles_file(path: &Path) -> Result<EnvironmentProfiles, LoadError> {
    log::debug!("loading environment profiles from {}", path.display());
    let content = fs::read_to_string(path)?;
    let raw: serde_json::Value = serde_json::from_str(&content)?;
    parse_profiles(raw)
}

/// Finds the environment file by searching `start_dir` and its parents
pub fn find_environment_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current_path = start_dir.to_path_buf();

    for _ in 0..=MAX_PARENT_SEARCH_DEPTH {
        for filename in ENV_FILE_NAMES {
            let candidate = current_path.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match current_path.parent() {
            Some(parent) => current_path = parent.to_path_buf(),
            None => break,
        }
    }

    None
}

/// Parses raw JSON into validated profiles
pub fn parse_profiles(raw: serde_json::Value) -> Result<EnvironmentProfiles, LoadError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| LoadError::InvalidFormat("root must be a JSON object".to_string()))?;

    let mut profiles = EnvironmentProfiles::new();

    for (key, value) in obj.iter() {
        match key.as_str() {
            "shared" | "$shared" => {
                profiles.shared = parse_variable_map(value, "shared")?;
            }
            "active" | "$active" => {
                profiles.active = value.as_str().map(str::to_string);
            }
            name => {
                if !is_valid_identifier(name) {
                    return Err(LoadError::InvalidFormat(format!(
                        "invalid profile name '{}': names must be alphanumeric with underscores/hyphens",
                        name
                    )));
                }

                let variables = parse_variable_map(value, name)?;
                profiles.add_profile(EnvironmentProfile::with_variables(name, variables));
            }
        }
    }

    if let Some(ref active) = profiles.active {
        if !profiles.has_profile(active) {
            return Err(LoadError::InvalidFormat(format!(
                "active profile '{}' does not exist",
                active
            )));
        }
    }

    Ok(profiles)
}

/// Parses a JSON object into a variable map, stringifying scalars
fn parse_variable_map(
    value: &serde_json::Value,
    context: &str,
) -> Result<BTreeMap<String, String>, LoadError> {
    let obj = value
        .as_object()
        .ok_or_else(|| LoadError::InvalidFormat(format!("'{}' must be a JSON object", context)))?;

    let mut map = BTreeMap::new();

    for (key, val) in obj.iter() {
        let value_str = match val {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            _ => {
                return Err(LoadError::InvalidFormat(format!(
                    "variable '{}' in '{}' must be a string, number, or boolean",
                    key, context
                )));
            }
        };

        map.insert(key.clone(), value_str);
    }

    Ok(map)
}

/// Profile names start with a letter or underscore and contain only
/// alphanumerics, underscores and hyphens. `shared`, `active` and any
/// `$`-prefixed name are reserved.
fn is_valid_identifier(name: &str) -> bool {
    if name == "shared" || name == "active" || name.starts_with('$') {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_env_file(dir: &Path, filename: &str, content: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_profiles_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_profiles(temp_dir.path()).unwrap();

        assert!(result.is_empty());
        assert!(result.shared.is_empty());
        assert!(result.active.is_none());
    }

    #[test]
    fn test_load_profiles_with_shared_and_active() {
        let temp_dir = TempDir::new().unwrap();
        let content = r#"{
            "$shared": { "version": "v1" },
            "$active": "dev",
            "dev": { "baseUrl": "http://localhost:3000" },
            "prod": { "baseUrl": "https://api.example.com" }
        }"#;
        create_temp_env_file(temp_dir.path(), ".api-suite-env.json", content);

        let profiles = load_profiles(temp_dir.path()).unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles.shared.get("version").unwrap(), "v1");
        assert_eq!(profiles.active.as_deref(), Some("dev"));
        assert_eq!(
            profiles.get_profile("prod").unwrap().get("baseUrl").unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_alternative_filename() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_env_file(
            temp_dir.path(),
            "api-suite.env.json",
            r#"{"dev": {"url": "http://localhost"}}"#,
        );

        let profiles = load_profiles(temp_dir.path()).unwrap();
        assert!(profiles.has_profile("dev"));
    }

    #[test]
    fn test_find_environment_file_max_depth() {
        let temp_dir = TempDir::new().unwrap();

        let mut current = temp_dir.path().to_path_buf();
        for i in 0..5 {
            current = current.join(format!("level{}", i));
            fs::create_dir(&current).unwrap();
        }

        create_temp_env_file(
            temp_dir.path(),
            ".api-suite-env.json",
            r#"{"dev": {"url": "http://localhost"}}"#,
        );

        let level3 = temp_dir.path().join("level0/level1/level2");
        assert_eq!(load_profiles(&level3).unwrap().len(), 1);

        let level5 = temp_dir.path().join("level0/level1/level2/level3/level4");
        assert_eq!(load_profiles(&level5).unwrap().len(), 0);
    }

    #[test]
    fn test_parse_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_env_file(temp_dir.path(), ".api-suite-env.json", "not valid json {");

        let result = load_profiles(temp_dir.path());
        assert!(matches!(result, Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_parse_root_not_object() {
        let result = parse_profiles(serde_json::json!(["a", "b"]));
        assert!(matches!(result, Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_invalid_active_profile() {
        let result = parse_profiles(serde_json::json!({
            "dev": { "url": "http://localhost" },
            "$active": "nonexistent"
        }));
        assert!(matches!(result, Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_variable_types() {
        let profiles = parse_profiles(serde_json::json!({
            "dev": {
                "stringVar": "hello",
                "numberVar": 42,
                "boolVar": true,
                "nullVar": null
            }
        }))
        .unwrap();
        let dev = profiles.get_profile("dev").unwrap();

        assert_eq!(dev.get("stringVar").unwrap(), "hello");
        assert_eq!(dev.get("numberVar").unwrap(), "42");
        assert_eq!(dev.get("boolVar").unwrap(), "true");
        assert_eq!(dev.get("nullVar").unwrap(), "");
    }

    #[test]
    fn test_parse_nested_object_rejected() {
        let result = parse_profiles(serde_json::json!({
            "dev": { "nested": { "a": 1 } }
        }));
        assert!(matches!(result, Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("dev"));
        assert!(is_valid_identifier("_dev"));
        assert!(is_valid_identifier("dev-staging"));

        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("123dev"));
        assert!(!is_valid_identifier("dev.test"));
        assert!(!is_valid_identifier("shared"));
        assert!(!is_valid_identifier("$shared"));
    }

    #[test]
    fn test_references_stored_verbatim() {
        let profiles = parse_profiles(serde_json::json!({
            "dev": {
                "baseUrl": "http://localhost:3000",
                "apiUrl": "{{baseUrl}}/api"
            }
        }))
        .unwrap();

        // Substitution happens when the environment processes a template
        assert_eq!(
            profiles.get_profile("dev").unwrap().get("apiUrl").unwrap(),
            "{{baseUrl}}/api"
        );
    }
}
