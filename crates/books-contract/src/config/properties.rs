// crates/books-contract/src/config/properties.rs
// ============================================================================
// Module: Properties Source
// Description: TOML-backed property set addressed by dotted keys.
// Purpose: Load the persisted settings file with hard limits.
// Dependencies: toml, tracing
// ============================================================================

//! ## Overview
//! The properties file is TOML. Nested tables are flattened into dotted keys
//! so `[base] url = "..."` and `"base.url" = "..."` are equivalent, and
//! scalars are stringified so typed coercion happens in one place (the
//! resolver). A missing file is an empty property set; an unreadable,
//! oversized, non-UTF-8, or unparsable file is an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum properties file size in bytes.
pub const MAX_PROPERTIES_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Property Set
// ============================================================================

/// Flattened dotted-key settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    /// Values keyed by dotted key.
    entries: BTreeMap<String, String>,
}

impl PropertySet {
    /// Returns an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set with `key` mapped to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Parses a TOML document into a flattened property set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML and
    /// [`ConfigError::Invalid`] for arrays or duplicate flattened keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let mut entries = BTreeMap::new();
        flatten_table("", &table, &mut entries)?;
        Ok(Self {
            entries,
        })
    }

    /// Loads a property set from disk.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds
    /// [`MAX_PROPERTIES_FILE_SIZE`], is not UTF-8, or is not valid TOML.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(ConfigError::Io(format!("{}: {err}", path.display()))),
        };
        if bytes.len() > MAX_PROPERTIES_FILE_SIZE {
            return Err(ConfigError::Invalid("properties file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("properties file must be utf-8".to_string()))?;
        Self::from_toml_str(content).map(Some)
    }

    /// Returns the value for a dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no keys are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Where a resolver obtains its property set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySource {
    /// Load from a TOML file on first use; a missing file is tolerated.
    File(PathBuf),
    /// Use a fixed in-memory property set.
    Inline(PropertySet),
}

impl PropertySource {
    /// Loads the property set, tolerating a missing file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an existing file cannot be loaded.
    pub(crate) fn load(&self) -> Result<PropertySet, ConfigError> {
        match self {
            Self::Inline(set) => Ok(set.clone()),
            Self::File(path) => {
                if let Some(set) = PropertySet::load(path)? {
                    tracing::debug!(path = %path.display(), keys = set.len(), "loaded properties file");
                    Ok(set)
                } else {
                    tracing::warn!(
                        path = %path.display(),
                        "properties file not found; using environment overrides only"
                    );
                    Ok(PropertySet::new())
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Flattens nested TOML tables into dotted keys.
fn flatten_table(
    prefix: &str,
    table: &toml::Table,
    out: &mut BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (name, value) in table {
        let key = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
        let scalar = match value {
            toml::Value::Table(nested) => {
                flatten_table(&key, nested, out)?;
                continue;
            }
            toml::Value::Array(_) => {
                return Err(ConfigError::Invalid(format!("{key} must be a scalar value")));
            }
            toml::Value::String(text) => text.clone(),
            toml::Value::Integer(number) => number.to_string(),
            toml::Value::Float(number) => number.to_string(),
            toml::Value::Boolean(flag) => flag.to_string(),
            toml::Value::Datetime(datetime) => datetime.to_string(),
        };
        if out.insert(key.clone(), scalar).is_some() {
            return Err(ConfigError::Invalid(format!("duplicate setting {key}")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
