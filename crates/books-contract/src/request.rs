// crates/books-contract/src/request.rs
// ============================================================================
// Module: Request Templates
// Description: Shared read-only request defaults built from configuration.
// Purpose: Memoize one template per factory with an explicit reset.
// Dependencies: reqwest, url
// ============================================================================

//! ## Overview
//! [`RequestTemplate`] carries the defaults every scenario shares: base URI,
//! base path, JSON content negotiation, timeouts, and the request log detail.
//! It never holds scenario state; paths and bodies arrive per call.
//! [`RequestSpecFactory`] builds the template on first use and hands out the
//! same [`Arc`] until [`RequestSpecFactory::reset`] is called.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use url::Url;

use crate::config::ConfigResolver;
use crate::config::EffectiveConfig;
use crate::error::ConfigError;
use crate::error::TransportError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type used for both request bodies and accepted responses.
pub const JSON_MEDIA_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Template
// ============================================================================

/// Level of request detail the logging filter emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDetail {
    /// Method and URL only.
    #[default]
    Summary,
    /// Method, URL, headers, and body.
    All,
}

/// Read-only request defaults shared by every scenario.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    /// Base address of the API under test.
    base_uri: Url,
    /// Normalized base path.
    base_path: String,
    /// Default headers (content type and accept).
    headers: HeaderMap,
    /// Request logging detail.
    log_detail: LogDetail,
    /// Connection timeout.
    connection_timeout: Duration,
    /// Socket (read) timeout.
    socket_timeout: Duration,
}

impl RequestTemplate {
    /// Builds a template from resolved configuration.
    #[must_use]
    pub fn from_config(config: &EffectiveConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        Self {
            base_uri: config.base_url.clone(),
            base_path: config.base_path.clone(),
            headers,
            log_detail: if config.request_logging { LogDetail::All } else { LogDetail::Summary },
            connection_timeout: config.connection_timeout,
            socket_timeout: config.socket_timeout,
        }
    }

    /// Returns the base URI.
    #[must_use]
    pub const fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// Returns the normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the default headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request logging detail.
    #[must_use]
    pub const fn log_detail(&self) -> LogDetail {
        self.log_detail
    }

    /// Returns the connection timeout.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the socket timeout.
    #[must_use]
    pub const fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    /// Joins base URI, base path, and a resource path into a request URL.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] when the joined URL does not parse.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let root = self.base_uri.as_str().trim_end_matches('/');
        let path = path.trim();
        let joined = if path.is_empty() {
            format!("{root}{}", self.base_path)
        } else if path.starts_with('/') {
            format!("{root}{}{path}", self.base_path)
        } else {
            format!("{root}{}/{path}", self.base_path)
        };
        Url::parse(&joined).map_err(|err| TransportError::InvalidUrl(format!("{joined}: {err}")))
    }
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Builds and memoizes the shared [`RequestTemplate`].
#[derive(Debug)]
pub struct RequestSpecFactory {
    /// Configuration the template is derived from.
    resolver: Arc<ConfigResolver>,
    /// Cached template.
    cached: Mutex<Option<Arc<RequestTemplate>>>,
}

impl RequestSpecFactory {
    /// Creates a factory over a configuration resolver.
    #[must_use]
    pub const fn new(resolver: Arc<ConfigResolver>) -> Self {
        Self {
            resolver,
            cached: Mutex::new(None),
        }
    }

    /// Returns the resolver backing this factory.
    #[must_use]
    pub const fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    /// Returns the shared template, building it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration cannot be resolved. Failures
    /// are not cached.
    pub fn request_template(&self) -> Result<Arc<RequestTemplate>, ConfigError> {
        let mut slot = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(template) = slot.as_ref() {
            return Ok(Arc::clone(template));
        }
        let config = self.resolver.effective()?;
        let template = Arc::new(RequestTemplate::from_config(&config));
        tracing::debug!(
            base_uri = %template.base_uri,
            base_path = %template.base_path,
            log_detail = ?template.log_detail,
            "built request template"
        );
        *slot = Some(Arc::clone(&template));
        Ok(template)
    }

    /// Clears the cached template and the resolver's caches.
    ///
    /// The next [`RequestSpecFactory::request_template`] call re-reads
    /// configuration.
    pub fn reset(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.resolver.reset();
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
