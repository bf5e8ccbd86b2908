// crates/books-contract/src/config/resolver.rs
// ============================================================================
// Module: Config Resolver
// Description: Dotted-key lookup with environment precedence and typed access.
// Purpose: Produce the immutable effective configuration exactly once.
// Dependencies: url, tracing
// ============================================================================

//! ## Overview
//! [`ConfigResolver`] owns a property source and an environment source. The
//! property set is loaded on first use and the [`EffectiveConfig`] is resolved
//! on first request; both are cached behind mutexes so concurrent first
//! access runs exactly one initializer. [`ConfigResolver::reset`] drops both
//! caches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;
use std::time::Duration;

use url::Url;

use super::env::EnvSource;
use super::env::ProcessEnv;
use super::env::env_key;
use super::properties::PropertySet;
use super::properties::PropertySource;
use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default properties filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "books-contract.toml";
/// Environment variable used to override the properties file path.
pub const CONFIG_PATH_ENV: &str = "BOOKS_CONTRACT_CONFIG";
/// First identifier handed to create/update targets when unset.
pub const DEFAULT_FIRST_SCENARIO_ID: i64 = 201;
/// Largest accepted `scenario.first.id`; leaves room to allocate every scenario id.
pub const MAX_FIRST_SCENARIO_ID: i64 = 1_000_000_000_000;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Settings understood by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Base address of the API under test.
    BaseUrl,
    /// Path prefix prepended to every resource path.
    BasePath,
    /// Connection timeout in milliseconds.
    ConnectionTimeout,
    /// Socket (read) timeout in milliseconds.
    SocketTimeout,
    /// Attach full-detail request logging to the request template.
    RequestLogging,
    /// Log response bodies.
    ResponseLogging,
    /// First identifier used for scenario-created books.
    FirstScenarioId,
    /// Optional JSON-lines call report path.
    ReportPath,
}

impl ConfigKey {
    /// Every key, in documentation order.
    pub const ALL: [Self; 8] = [
        Self::BaseUrl,
        Self::BasePath,
        Self::ConnectionTimeout,
        Self::SocketTimeout,
        Self::RequestLogging,
        Self::ResponseLogging,
        Self::FirstScenarioId,
        Self::ReportPath,
    ];

    /// Returns the dotted key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "base.url",
            Self::BasePath => "base.path",
            Self::ConnectionTimeout => "connection.timeout",
            Self::SocketTimeout => "socket.timeout",
            Self::RequestLogging => "enable.request.logging",
            Self::ResponseLogging => "enable.response.logging",
            Self::FirstScenarioId => "scenario.first.id",
            Self::ReportPath => "report.path",
        }
    }

    /// Returns the environment variable that overrides this key.
    #[must_use]
    pub fn env_name(self) -> String {
        env_key(self.as_str())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Effective Config
// ============================================================================

/// Resolved, validated settings for one harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Absolute `http`/`https` base address.
    pub base_url: Url,
    /// Normalized base path (`""` or `/segment...` without a trailing slash).
    pub base_path: String,
    /// Connection timeout.
    pub connection_timeout: Duration,
    /// Socket (read) timeout.
    pub socket_timeout: Duration,
    /// Full-detail request logging.
    pub request_logging: bool,
    /// Response body logging.
    pub response_logging: bool,
    /// First identifier for scenario-created books.
    pub first_scenario_id: i64,
    /// Optional JSON-lines call report path.
    pub report_path: Option<PathBuf>,
}

impl EffectiveConfig {
    /// Resolves and validates every setting through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required setting is missing or any
    /// setting is malformed.
    pub fn resolve(resolver: &ConfigResolver) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&resolver.base_url()?)?;
        let base_path = normalize_base_path(resolver.base_path()?.as_deref());
        let first_scenario_id = match resolver.get(ConfigKey::FirstScenarioId.as_str())? {
            Some(raw) => parse_positive_id(ConfigKey::FirstScenarioId, &raw)?,
            None => DEFAULT_FIRST_SCENARIO_ID,
        };
        Ok(Self {
            base_url,
            base_path,
            connection_timeout: resolver.connection_timeout()?,
            socket_timeout: resolver.socket_timeout()?,
            request_logging: resolver.request_logging_enabled()?,
            response_logging: resolver.response_logging_enabled()?,
            first_scenario_id,
            report_path: resolver.get(ConfigKey::ReportPath.as_str())?.map(PathBuf::from),
        })
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves dotted keys against environment overrides and a property source.
pub struct ConfigResolver {
    /// Where the property set comes from.
    source: PropertySource,
    /// Environment override lookup.
    env: Arc<dyn EnvSource>,
    /// Property set, loaded on first use.
    properties: Mutex<Option<Arc<PropertySet>>>,
    /// Effective configuration, resolved on first request.
    effective: Mutex<Option<Arc<EffectiveConfig>>>,
}

impl fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver").field("source", &self.source).finish_non_exhaustive()
    }
}

impl ConfigResolver {
    /// Creates a resolver over explicit property and environment sources.
    #[must_use]
    pub fn new(source: PropertySource, env: Arc<dyn EnvSource>) -> Self {
        Self {
            source,
            env,
            properties: Mutex::new(None),
            effective: Mutex::new(None),
        }
    }

    /// Creates a resolver over the process environment and the default file.
    ///
    /// The file path is taken from `BOOKS_CONTRACT_CONFIG` when set and
    /// non-empty, otherwise `books-contract.toml` in the working directory.
    #[must_use]
    pub fn from_process_env() -> Self {
        let env: Arc<dyn EnvSource> = Arc::new(ProcessEnv);
        let path = env
            .var(CONFIG_PATH_ENV)
            .ok()
            .flatten()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from);
        Self::new(PropertySource::File(path), env)
    }

    /// Returns the process-wide resolver, created on first access.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ConfigResolver>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::from_process_env())))
    }

    /// Returns the effective value for a dotted key.
    ///
    /// The environment override wins when set and non-empty; otherwise the
    /// property value (possibly absent) is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the property source cannot be loaded or
    /// the override is not valid UTF-8.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(value) = self.env.var(&env_key(key))?
            && !value.is_empty()
        {
            return Ok(Some(value));
        }
        Ok(self.properties()?.get(key).map(str::to_string))
    }

    /// Returns the base address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when unset.
    pub fn base_url(&self) -> Result<String, ConfigError> {
        self.required(ConfigKey::BaseUrl)
    }

    /// Returns the base path, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the sources cannot be read.
    pub fn base_path(&self) -> Result<Option<String>, ConfigError> {
        self.get(ConfigKey::BasePath.as_str())
    }

    /// Returns the connection timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when unset, non-numeric, or zero.
    pub fn connection_timeout(&self) -> Result<Duration, ConfigError> {
        parse_timeout_millis(ConfigKey::ConnectionTimeout, &self.required(ConfigKey::ConnectionTimeout)?)
    }

    /// Returns the socket timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when unset, non-numeric, or zero.
    pub fn socket_timeout(&self) -> Result<Duration, ConfigError> {
        parse_timeout_millis(ConfigKey::SocketTimeout, &self.required(ConfigKey::SocketTimeout)?)
    }

    /// Returns whether full-detail request logging is enabled (unset is false).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] for an unrecognized boolean literal.
    pub fn request_logging_enabled(&self) -> Result<bool, ConfigError> {
        self.flag(ConfigKey::RequestLogging)
    }

    /// Returns whether response body logging is enabled (unset is false).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] for an unrecognized boolean literal.
    pub fn response_logging_enabled(&self) -> Result<bool, ConfigError> {
        self.flag(ConfigKey::ResponseLogging)
    }

    /// Returns the effective configuration, resolving it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when resolution fails. Failures are not cached.
    pub fn effective(&self) -> Result<Arc<EffectiveConfig>, ConfigError> {
        let mut slot = self.effective.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = slot.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(EffectiveConfig::resolve(self)?);
        tracing::debug!(
            base_url = %config.base_url,
            base_path = %config.base_path,
            "resolved effective configuration"
        );
        *slot = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Drops the cached property set and effective configuration.
    pub fn reset(&self) {
        *self.effective.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self.properties.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the cached property set, loading it on first use.
    fn properties(&self) -> Result<Arc<PropertySet>, ConfigError> {
        let mut slot = self.properties.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = slot.as_ref() {
            return Ok(Arc::clone(set));
        }
        let set = Arc::new(self.source.load()?);
        *slot = Some(Arc::clone(&set));
        Ok(set)
    }

    /// Returns a required value or a missing-setting error.
    fn required(&self, key: ConfigKey) -> Result<String, ConfigError> {
        self.get(key.as_str())?.ok_or_else(|| ConfigError::Missing {
            key: key.as_str().to_string(),
            env: key.env_name(),
        })
    }

    /// Returns a boolean flag, treating an unset key as false.
    fn flag(&self, key: ConfigKey) -> Result<bool, ConfigError> {
        self.get(key.as_str())?.map_or(Ok(false), |raw| parse_bool(key, &raw))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a positive millisecond timeout.
fn parse_timeout_millis(key: ConfigKey, raw: &str) -> Result<Duration, ConfigError> {
    let millis: u64 = raw.trim().parse().map_err(|_| {
        ConfigError::malformed(key.as_str(), format!("`{raw}` is not a whole number of milliseconds"))
    })?;
    if millis == 0 {
        return Err(ConfigError::malformed(key.as_str(), "must be greater than zero"));
    }
    Ok(Duration::from_millis(millis))
}

/// Parses a boolean literal (`true`/`false`, `1`/`0`).
fn parse_bool(key: ConfigKey, raw: &str) -> Result<bool, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(ConfigError::malformed(key.as_str(), format!("`{raw}` must be 1, 0, true, or false")))
}

/// Parses a positive integer identifier.
fn parse_positive_id(key: ConfigKey, raw: &str) -> Result<i64, ConfigError> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::malformed(key.as_str(), format!("`{raw}` is not an integer")))?;
    if id <= 0 {
        return Err(ConfigError::malformed(key.as_str(), "must be greater than zero"));
    }
    if id > MAX_FIRST_SCENARIO_ID {
        return Err(ConfigError::malformed(
            key.as_str(),
            format!("must be at most {MAX_FIRST_SCENARIO_ID}"),
        ));
    }
    Ok(id)
}

/// Parses and validates the base address.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let key = ConfigKey::BaseUrl.as_str();
    let url = Url::parse(raw.trim()).map_err(|err| ConfigError::malformed(key, err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::malformed(key, "scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::malformed(key, "missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::malformed(key, "must not carry a query or fragment"));
    }
    Ok(url)
}

/// Normalizes a base path to `""` or `/a/b` form.
pub(crate) fn normalize_base_path(raw: Option<&str>) -> String {
    let trimmed = raw.unwrap_or_default().trim().trim_matches('/');
    if trimmed.is_empty() { String::new() } else { format!("/{trimmed}") }
}
