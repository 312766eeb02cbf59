//! Suite environment
//!
//! The [`Environment`] is the mutable variable store shared by every call in a
//! suite run. Calls read it when their templates are resolved; post-call hooks
//! write to it so later calls can consume values produced by earlier ones
//! (an auth token, a created resource id).
//!
//! # Example
//!
//! ```
//! use api_suite::environment::Environment;
//!
//! let env = Environment::new();
//! env.set("host", "api.example.com");
//! env.set("base", "https://{{host}}");
//!
//! assert_eq!(env.process("{{base}}/users").unwrap(), "https://api.example.com/users");
//! assert_eq!(env.process("{{missing}}").unwrap(), "");
//! ```

pub mod loader;
pub mod models;
pub mod store;

use crate::variables::{TemplateError, TemplateResolver, VariableLookup};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub use loader::{find_environment_file, load_profiles, load_profiles_file, LoadError};
pub use models::{EnvironmentProfile, EnvironmentProfiles};
pub use store::{InMemoryStore, VariableStore};

/// Shared handle to a suite's variables.
///
/// Cloning the handle does not copy the variables: all clones read and write
/// the same store.
#[derive(Debug, Clone)]
pub struct Environment {
    store: Arc<dyn VariableStore>,
    resolver: TemplateResolver,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates an empty environment backed by an [`InMemoryStore`].
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Creates an environment over an existing store.
    pub fn with_store(store: Arc<dyn VariableStore>) -> Self {
        Self {
            store,
            resolver: TemplateResolver::default(),
        }
    }

    /// Creates an environment seeded with `variables`.
    pub fn from_variables<I, K, V>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let seeded: BTreeMap<String, String> = variables
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_store(Arc::new(InMemoryStore::with_variables(seeded)))
    }

    /// Creates an environment from shared variables overlaid with profile
    /// `name`. With `None`, the file's own active profile is used, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnknownProfile`] if the profile does not exist.
    pub fn from_profiles(
        profiles: &EnvironmentProfiles,
        name: Option<&str>,
    ) -> Result<Self, LoadError> {
        let selected = name.or(profiles.active.as_deref());
        let variables = profiles.merged_variables(selected).ok_or_else(|| {
            LoadError::UnknownProfile(selected.unwrap_or_default().to_string())
        })?;
        Ok(Self::from_variables(variables))
    }

    /// Loads profiles found from `start_dir` and seeds an environment from
    /// profile `name`.
    pub fn load(start_dir: &Path, name: Option<&str>) -> Result<Self, LoadError> {
        let profiles = load_profiles(start_dir)?;
        Self::from_profiles(&profiles, name)
    }

    /// Replaces the template resolver used by [`process`](Self::process).
    pub fn with_resolver(mut self, resolver: TemplateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> TemplateResolver {
        self.resolver
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    /// Returns the value of `key`, or `default` when unset.
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.store.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Sets `key` to `value`, overwriting any previous value.
    pub fn set(&self, key: impl AsRef<str>, value: impl AsRef<str>) {
        self.store.set(key.as_ref(), value.as_ref());
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.store.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets every pair from `variables`.
    pub fn extend<I, K, V>(&self, variables: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in variables {
            self.set(key, value);
        }
    }

    /// All entries in lexicographic key order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.store.entries()
    }

    /// Copy of all variables.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.store.entries().into_iter().collect()
    }

    /// Resolves the `{{name}}` placeholders in `template`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Divergence`] when variables reference each
    /// other in a cycle or substitution does not settle within the resolver's
    /// pass bound.
    pub fn process(&self, template: &str) -> Result<String, TemplateError> {
        self.resolver.resolve(template, self)
    }
}

impl VariableLookup for Environment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.store.get(name)
    }
}
