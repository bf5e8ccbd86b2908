// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed knobs for the system-test binaries.
// Purpose: Parse run root, stub bind, timeout, and overwrite settings.
// Dependencies: books-contract
// ============================================================================

//! ## Overview
//! Settings are read through [`EnvSource`], the same seam the harness uses
//! for its own overrides, so tests can supply a [`books_contract::config::MapEnv`]
//! instead of mutating the process environment. A set but empty or malformed
//! value is an error; an unset value falls back to the default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use books_contract::config::EnvSource;
use books_contract::config::ProcessEnv;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Environment variables read by [`SystemTestConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Directory that receives per-test artifact folders.
    RunRoot,
    /// Fixed bind address for the in-process Books stub.
    StubBind,
    /// Lower bound, in whole seconds, for readiness and socket timeouts.
    TimeoutSeconds,
    /// Permit writing into a non-empty artifact folder.
    AllowOverwrite,
}

impl SystemTestEnv {
    /// Every key.
    pub const ALL: [Self; 4] = [Self::RunRoot, Self::StubBind, Self::TimeoutSeconds, Self::AllowOverwrite];

    /// Returns the variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "BOOKS_SYSTEM_TEST_RUN_ROOT",
            Self::StubBind => "BOOKS_SYSTEM_TEST_STUB_BIND",
            Self::TimeoutSeconds => "BOOKS_SYSTEM_TEST_TIMEOUT_SEC",
            Self::AllowOverwrite => "BOOKS_SYSTEM_TEST_ALLOW_OVERWRITE",
        }
    }

    /// Reads this key from `env` and parses it.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable when the value is not UTF-8, is
    /// blank, or is rejected by `parse`.
    pub fn read<T>(
        self,
        env: &dyn EnvSource,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<Option<T>, String> {
        let name = self.as_str();
        let Some(raw) = env.var(name).map_err(|err| err.to_string())? else {
            return Ok(None);
        };
        let value = raw.trim();
        if value.is_empty() {
            return Err(format!("{name} is set but empty"));
        }
        parse(value).map(Some).map_err(|reason| format!("{name}: {reason}"))
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Parsed system-test settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Artifact run root; a timestamped folder under `target/` when unset.
    pub run_root: Option<PathBuf>,
    /// Stub bind address; an ephemeral loopback port when unset.
    pub stub_bind: Option<SocketAddr>,
    /// Timeout floor.
    pub timeout: Option<Duration>,
    /// Permit writing into a non-empty artifact folder.
    pub allow_overwrite: bool,
}

impl SystemTestConfig {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid variable.
    pub fn load() -> Result<Self, String> {
        Self::from_env(&ProcessEnv)
    }

    /// Loads settings from `env`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid variable.
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, String> {
        Ok(Self {
            run_root: SystemTestEnv::RunRoot.read(env, |value| Ok(PathBuf::from(value)))?,
            stub_bind: SystemTestEnv::StubBind.read(env, parse_bind)?,
            timeout: SystemTestEnv::TimeoutSeconds.read(env, parse_seconds)?,
            allow_overwrite: SystemTestEnv::AllowOverwrite.read(env, parse_flag)?.unwrap_or(false),
        })
    }
}

// ============================================================================
// SECTION: Parsers
// ============================================================================

/// Parses `host:port`.
fn parse_bind(value: &str) -> Result<SocketAddr, String> {
    value.parse().map_err(|_| format!("expected host:port, got {value}"))
}

/// Parses a positive whole number of seconds.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    match value.parse::<u64>() {
        Ok(0) => Err("timeout must be at least one second".to_string()),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("expected whole seconds, got {value}")),
    }
}

/// Accepts `true`/`false` in any case and `1`/`0`.
fn parse_flag(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("expected true, false, 1, or 0, got {value}")),
    }
}
