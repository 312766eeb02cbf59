//! Environment profile models
//!
//! Profiles are named sets of variables (e.g. "dev", "staging") plus a set of
//! shared variables common to all of them. A suite run seeds its
//! [`Environment`](super::Environment) from one profile merged over the shared
//! variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single named set of variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentProfile {
    /// Profile name (e.g., "dev", "staging", "production")
    pub name: String,

    /// Variable key-value pairs for this profile
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl EnvironmentProfile {
    /// Creates a new empty profile with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Creates a profile with name and variables
    pub fn with_variables(name: impl Into<String>, variables: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            variables,
        }
    }

    /// Gets a variable value by name
    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Sets a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// All profiles loaded from an environment file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentProfiles {
    /// Named profiles
    #[serde(default)]
    pub profiles: BTreeMap<String, EnvironmentProfile>,

    /// Variables available in every profile
    #[serde(default)]
    pub shared: BTreeMap<String, String>,

    /// Profile selected by the file itself, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
}

impl EnvironmentProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a profile, replacing any profile with the same name
    pub fn add_profile(&mut self, profile: EnvironmentProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get_profile(&self, name: &str) -> Option<&EnvironmentProfile> {
        self.profiles.get(name)
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Sets a shared variable
    pub fn set_shared(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.shared.insert(key.into(), value.into());
    }

    /// Returns shared variables overlaid with the variables of profile `name`.
    ///
    /// Profile variables take precedence over shared ones. `None` as the name
    /// yields only the shared variables. Returns `None` if the named profile
    /// does not exist.
    pub fn merged_variables(&self, name: Option<&str>) -> Option<BTreeMap<String, String>> {
        let mut merged = self.shared.clone();

        if let Some(name) = name {
            let profile = self.profiles.get(name)?;
            merged.extend(profile.variables.clone());
        }

        Some(merged)
    }

    /// Lists all profile names in order
    pub fn list_profiles(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
