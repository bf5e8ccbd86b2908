// crates/books-contract/src/filters.rs
// ============================================================================
// Module: Call Filters
// Description: Instrumentation hooks run around every HTTP call.
// Purpose: Uniform reporting and request/response logging for a suite.
// Dependencies: tracing, url
// ============================================================================

//! ## Overview
//! A [`FilterChain`] is installed once per suite. The standard chain runs, in
//! order, structured call reporting, request logging, and response logging.
//! Filters observe calls; they never alter requests or responses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use url::Url;

use crate::client::ApiResponse;
use crate::client::HttpMethod;
use crate::error::TransportError;
use crate::report::CallRecord;
use crate::report::ReportSink;
use crate::request::LogDetail;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request as it is about to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Per-suite call sequence number.
    pub sequence: u64,
    /// Scenario label.
    pub label: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Full request URL.
    pub url: Url,
    /// Default headers applied from the template.
    pub headers: Vec<(String, String)>,
    /// Encoded body.
    pub body: Option<String>,
    /// Logging detail requested by the template.
    pub log_detail: LogDetail,
}

/// Observer of HTTP calls.
pub trait CallFilter: Send + Sync {
    /// Called before the request is sent.
    fn before_send(&self, _request: &PreparedRequest) {}

    /// Called after a response was fully read.
    fn after_response(&self, _request: &PreparedRequest, _response: &ApiResponse) {}

    /// Called when the transport failed.
    fn after_failure(&self, _request: &PreparedRequest, _error: &TransportError, _elapsed: Duration) {
    }
}

// ============================================================================
// SECTION: Chain
// ============================================================================

/// Ordered filters plus the shared call sequence counter.
#[derive(Clone, Default)]
pub struct FilterChain {
    /// Filters in invocation order.
    filters: Vec<Arc<dyn CallFilter>>,
    /// Monotonic call counter.
    sequence: Arc<AtomicU64>,
}

impl FilterChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard chain: reporting, request logging, response logging.
    #[must_use]
    pub fn standard(sinks: Vec<Arc<dyn ReportSink>>, log_response_bodies: bool) -> Self {
        Self::new()
            .with(Arc::new(ReportingFilter::new(sinks)))
            .with(Arc::new(RequestLoggingFilter))
            .with(Arc::new(ResponseLoggingFilter::new(log_response_bodies)))
    }

    /// Appends a filter.
    #[must_use]
    pub fn with(mut self, filter: Arc<dyn CallFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Returns the number of installed filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true when no filters are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns the next call sequence number (starting at 1).
    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Runs every filter's `before_send`.
    pub(crate) fn before_send(&self, request: &PreparedRequest) {
        for filter in &self.filters {
            filter.before_send(request);
        }
    }

    /// Runs every filter's `after_response`.
    pub(crate) fn after_response(&self, request: &PreparedRequest, response: &ApiResponse) {
        for filter in &self.filters {
            filter.after_response(request, response);
        }
    }

    /// Runs every filter's `after_failure`.
    pub(crate) fn after_failure(
        &self,
        request: &PreparedRequest,
        error: &TransportError,
        elapsed: Duration,
    ) {
        for filter in &self.filters {
            filter.after_failure(request, error, elapsed);
        }
    }
}

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Writes one [`CallRecord`] per call to every sink.
pub struct ReportingFilter {
    /// Record destinations.
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl ReportingFilter {
    /// Creates a reporting filter.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn ReportSink>>) -> Self {
        Self {
            sinks,
        }
    }

    /// Fans a record out to every sink.
    fn emit(&self, record: &CallRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }

    /// Starts a record populated with request data.
    fn record_for(request: &PreparedRequest) -> CallRecord {
        let mut record =
            CallRecord::new(request.sequence, &request.label, request.method, request.url.as_str());
        record.request_body.clone_from(&request.body);
        record
    }
}

impl CallFilter for ReportingFilter {
    fn after_response(&self, request: &PreparedRequest, response: &ApiResponse) {
        let mut record = Self::record_for(request);
        record.status = Some(response.status);
        record.content_type.clone_from(&response.content_type);
        record.response_body = Some(response.body.clone());
        record.duration_ms = response.elapsed.as_millis();
        self.emit(&record);
    }

    fn after_failure(&self, request: &PreparedRequest, error: &TransportError, elapsed: Duration) {
        let mut record = Self::record_for(request);
        record.duration_ms = elapsed.as_millis();
        record.error = Some(error.to_string());
        self.emit(&record);
    }
}

/// Logs outgoing requests; full detail when the template asks for it.
pub struct RequestLoggingFilter;

impl CallFilter for RequestLoggingFilter {
    fn before_send(&self, request: &PreparedRequest) {
        match request.log_detail {
            LogDetail::Summary => tracing::debug!(
                scenario = %request.label,
                method = %request.method,
                url = %request.url,
                "request"
            ),
            LogDetail::All => {
                let headers = request
                    .headers
                    .iter()
                    .map(|(name, value)| format!("{name}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::info!(
                    scenario = %request.label,
                    method = %request.method,
                    url = %request.url,
                    headers = %headers,
                    body = request.body.as_deref().unwrap_or(""),
                    "request"
                );
            }
        }
    }
}

/// Logs responses; bodies only when response logging is enabled.
pub struct ResponseLoggingFilter {
    /// Include response bodies.
    log_bodies: bool,
}

impl ResponseLoggingFilter {
    /// Creates a response logging filter.
    #[must_use]
    pub const fn new(log_bodies: bool) -> Self {
        Self {
            log_bodies,
        }
    }
}

impl CallFilter for ResponseLoggingFilter {
    fn after_response(&self, request: &PreparedRequest, response: &ApiResponse) {
        if self.log_bodies {
            tracing::info!(
                scenario = %request.label,
                status = response.status,
                content_type = response.content_type.as_deref().unwrap_or(""),
                elapsed_ms = response.elapsed.as_millis(),
                body = %response.body,
                "response"
            );
        } else {
            tracing::debug!(
                scenario = %request.label,
                status = response.status,
                elapsed_ms = response.elapsed.as_millis(),
                "response"
            );
        }
    }

    fn after_failure(&self, request: &PreparedRequest, error: &TransportError, elapsed: Duration) {
        tracing::warn!(
            scenario = %request.label,
            method = %request.method,
            url = %request.url,
            elapsed_ms = elapsed.as_millis(),
            error = %error,
            "transport failure"
        );
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
