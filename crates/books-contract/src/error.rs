// crates/books-contract/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Typed failures for configuration, transport, and suite setup.
// Purpose: Keep every failure class explicit at the scenario boundary.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Errors are split by the layer that raises them. Configuration errors are
//! fatal at suite setup, transport errors fail a single scenario, and contract
//! violations (see [`crate::oracle::ContractViolation`]) carry the literal
//! mismatch. Nothing here is retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::schemas::SchemaError;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Configuration resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting has no value in the environment or the properties file.
    #[error("missing required setting `{key}` (env override `{env}`)")]
    Missing {
        /// Dotted configuration key.
        key: String,
        /// Environment variable consulted for the override.
        env: String,
    },
    /// A setting is present but cannot be coerced to the expected type.
    #[error("malformed setting `{key}`: {reason}")]
    Malformed {
        /// Dotted configuration key.
        key: String,
        /// Human-readable coercion failure.
        reason: String,
    },
    /// I/O failure while reading the properties file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Builds a malformed-setting error for `key`.
    pub(crate) fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Transport Errors
// ============================================================================

/// HTTP transport failures. These are reported, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),
    /// The request URL could not be built from the template and call path.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    /// The request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(String),
    /// Connection could not be established in time or was refused.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The connection or socket timeout elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Any other failure while sending the request or reading the response.
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() {
            Self::Client(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

// ============================================================================
// SECTION: Harness Errors
// ============================================================================

/// Suite setup failures. Any of these aborts the suite before scenarios run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The HTTP client could not be prepared.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Bundled schemas failed to compile.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The report sink could not be opened.
    #[error("report sink error: {0}")]
    Report(String),
}
