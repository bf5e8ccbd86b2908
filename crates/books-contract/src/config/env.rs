// crates/books-contract/src/config/env.rs
// ============================================================================
// Module: Environment Overrides
// Description: Environment lookups used to override file-sourced settings.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are read through [`EnvSource`] so resolvers can be fed
//! a fixed map in tests instead of mutating the process environment. Invalid
//! UTF-8 fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Key Transform
// ============================================================================

/// Returns the environment variable name that overrides a dotted key.
///
/// `base.url` becomes `BASE_URL`, `enable.request.logging` becomes
/// `ENABLE_REQUEST_LOGGING`.
#[must_use]
pub fn env_key(key: &str) -> String {
    key.to_uppercase().replace('.', "_")
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// Source of environment variable values.
pub trait EnvSource: Send + Sync {
    /// Returns the raw value of `name`, or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not valid UTF-8.
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError>;
}

/// Reads the live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        std::env::var_os(name).map_or(Ok(None), |raw| {
            raw.into_string()
                .map(Some)
                .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
        })
    }
}

/// Fixed in-memory environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    /// Variable values keyed by name.
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the environment with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.vars.get(name).cloned())
    }
}
