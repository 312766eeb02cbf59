//! Variable substitution engine
//!
//! This module replaces `{{variable}}` placeholders with values looked up in a
//! [`VariableLookup`] source. A value may itself contain placeholders, so
//! substitution runs in passes until no placeholder is left. Cycles and
//! runaway growth are reported as [`TemplateError::Divergence`] instead of
//! looping forever.
//!
//! Two resolution modes exist:
//!
//! - [`ResolutionMode::Embedded`] (default) replaces every placeholder found
//!   anywhere in the text, so `"Bearer {{token}}"` resolves.
//! - [`ResolutionMode::WholeMatch`] only substitutes while the entire string is
//!   exactly one placeholder. `"Bearer {{token}}"` is left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Default bound on substitution passes for one template.
pub const DEFAULT_MAX_PASSES: usize = 10;

/// Matches an escaped `\{{` or `\}}`, or a `{{name}}` placeholder (group 1).
///
/// Escapes are listed first so a backslash-prefixed brace pair is never
/// taken as the start of a placeholder.
static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\\{\{|\\\}\}|\{\{([^{}]+)\}\}").expect("Failed to compile variable regex")
});

/// Matches a string that is exactly one `{{name}}` placeholder.
static WHOLE_VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{([^{}]+)\}\}$").expect("Failed to compile whole-match variable regex")
});

/// Errors raised while resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Substitution did not reach a fixpoint within the pass bound, or
    /// revisited an intermediate result (a reference cycle).
    #[error("template resolution diverged for '{template}' after {passes} passes")]
    Divergence { template: String, passes: usize },
}

/// How placeholders inside a template are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Every placeholder anywhere in the string is substituted.
    #[default]
    Embedded,
    /// Substitution only happens while the whole string is one placeholder.
    WholeMatch,
}

/// A source of variable values.
pub trait VariableLookup {
    /// Returns the value bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<String>;
}

impl VariableLookup for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl VariableLookup for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<L: VariableLookup + ?Sized> VariableLookup for &L {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// Resolves templates against a variable source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateResolver {
    mode: ResolutionMode,
    max_passes: usize,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new(ResolutionMode::default())
    }
}

impl TemplateResolver {
    /// Creates a resolver using `mode` and the default pass bound.
    pub fn new(mode: ResolutionMode) -> Self {
        Self {
            mode,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Overrides the pass bound. A bound of zero is raised to one.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Builds a resolver from suite configuration.
    pub fn from_config(config: &crate::config::SuiteConfig) -> Self {
        Self::new(config.resolution_mode).with_max_passes(config.max_resolution_passes)
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Resolves every placeholder in `template`.
    ///
    /// Unknown variables resolve to the empty string. `\{{` and `\}}` are kept
    /// as literal `{{` and `}}` and never start a placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Divergence`] when substitution revisits an
    /// earlier intermediate result or exceeds the pass bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use api_suite::variables::TemplateResolver;
    /// use std::collections::HashMap;
    ///
    /// let mut vars = HashMap::new();
    /// vars.insert("host".to_string(), "api.example.com".to_string());
    /// vars.insert("base".to_string(), "https://{{host}}".to_string());
    ///
    /// let resolver = TemplateResolver::default();
    /// assert_eq!(
    ///     resolver.resolve("{{base}}/users", &vars).unwrap(),
    ///     "https://api.example.com/users"
    /// );
    /// ```
    pub fn resolve<L>(&self, template: &str, vars: &L) -> Result<String, TemplateError>
    where
        L: VariableLookup + ?Sized,
    {
        // Fast path: no placeholder or escape markers at all
        if !template.contains("{{") && !template.contains("}}") {
            return Ok(template.to_string());
        }

        let mut current = template.to_string();
        let mut seen = HashSet::new();
        seen.insert(current.clone());
        let mut passes = 0;

        while self.has_placeholder(&current) {
            if passes == self.max_passes {
                return Err(TemplateError::Divergence {
                    template: template.to_string(),
                    passes,
                });
            }

            let next = self.substitute_pass(&current, vars);
            passes += 1;

            if !seen.insert(next.clone()) {
                return Err(TemplateError::Divergence {
                    template: template.to_string(),
                    passes,
                });
            }
            current = next;
        }

        log::trace!("resolved template in {} passes", passes);
        Ok(unescape(&current))
    }

    fn has_placeholder(&self, text: &str) -> bool {
        match self.mode {
            ResolutionMode::Embedded => TOKEN_REGEX
                .captures_iter(text)
                .any(|caps| caps.get(1).is_some()),
            ResolutionMode::WholeMatch => WHOLE_VARIABLE_REGEX.is_match(text),
        }
    }

    /// Replaces the placeholders found in `text` once. Escapes are kept so
    /// later passes still see them as literal braces.
    fn substitute_pass<L>(&self, text: &str, vars: &L) -> String
    where
        L: VariableLookup + ?Sized,
    {
        let pattern: &Regex = match self.mode {
            ResolutionMode::Embedded => &TOKEN_REGEX,
            ResolutionMode::WholeMatch => &WHOLE_VARIABLE_REGEX,
        };

        pattern
            .replace_all(text, |caps: &Captures<'_>| match caps.get(1) {
                Some(name) => lookup_or_empty(vars, name.as_str().trim()),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

fn lookup_or_empty<L>(vars: &L, name: &str) -> String
where
    L: VariableLookup + ?Sized,
{
    vars.lookup(name).unwrap_or_else(|| {
        log::debug!("variable '{}' is not defined, using empty value", name);
        String::new()
    })
}

/// Substitutes all `{{variable}}` placeholders using the default resolver.
///
/// # Examples
///
/// ```
/// use api_suite::variables::substitute_variables;
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert("token".to_string(), "abc".to_string());
///
/// assert_eq!(substitute_variables("Bearer {{token}}", &vars).unwrap(), "Bearer abc");
/// assert_eq!(substitute_variables("{{missing}}", &vars).unwrap(), "");
/// ```
pub fn substitute_variables<L>(text: &str, vars: &L) -> Result<String, TemplateError>
where
    L: VariableLookup + ?Sized,
{
    TemplateResolver::default().resolve(text, vars)
}

/// Turns `\{{` and `\}}` into literal braces, leaving everything else as is.
fn unescape(text: &str) -> String {
    TOKEN_REGEX
        .replace_all(text, |caps: &Captures<'_>| match &caps[0] {
            "\\{{" => "{{".to_string(),
            "\\}}" => "}}".to_string(),
            other => other.to_string(),
        })
        .into_owned()
}
