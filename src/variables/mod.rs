//! Variables module for API suites
//!
//! This module provides template resolution for call URLs, headers, query and
//! route parameters and bodies. Values are looked up in the suite environment.

pub mod substitution;

pub use substitution::{
    substitute_variables, ResolutionMode, TemplateError, TemplateResolver, VariableLookup,
    DEFAULT_MAX_PASSES,
};
