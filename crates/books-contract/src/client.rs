// crates/books-contract/src/client.rs
// ============================================================================
// Module: Books HTTP Client
// Description: Sends scenario calls using the shared request template.
// Purpose: Narrow transport surface with timeouts and filter hooks.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`BooksClient`] wraps a `reqwest` client configured with the template's
//! connection and socket timeouts. Each [`ApiCall`] supplies its own method,
//! path, and body; the template supplies everything shared. Every call passes
//! through the installed [`FilterChain`]. Transport failures are returned as
//! [`TransportError`] and never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;

use crate::error::TransportError;
use crate::filters::FilterChain;
use crate::filters::PreparedRequest;
use crate::request::RequestTemplate;

// ============================================================================
// SECTION: Calls
// ============================================================================

/// HTTP verbs used against the Books resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Converts to the transport method.
    fn to_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body supplied by a scenario.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// A JSON value serialized on send.
    Json(Value),
    /// Raw text sent verbatim (used for malformed JSON).
    Raw(String),
}

impl RequestBody {
    /// Encodes the body as text, or `None` for an empty body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encode`] when JSON serialization fails.
    pub fn encode(&self) -> Result<Option<String>, TransportError> {
        match self {
            Self::Empty => Ok(None),
            Self::Json(value) => serde_json::to_string(value)
                .map(Some)
                .map_err(|err| TransportError::Encode(err.to_string())),
            Self::Raw(text) => Ok(Some(text.clone())),
        }
    }
}

/// One HTTP call: method, resource path, and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    /// HTTP method.
    pub method: HttpMethod,
    /// Resource path relative to the base path (for example `/Books/1`).
    pub path: String,
    /// Request body.
    pub body: RequestBody,
}

impl ApiCall {
    /// Builds a GET call.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, RequestBody::Empty)
    }

    /// Builds a POST call with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, path, RequestBody::Json(body))
    }

    /// Builds a PUT call with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, path, RequestBody::Json(body))
    }

    /// Builds a DELETE call.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, RequestBody::Empty)
    }

    /// Builds a call with an explicit method and body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }

    /// Replaces the body with raw text sent verbatim.
    #[must_use]
    pub fn with_raw_body(mut self, text: impl Into<String>) -> Self {
        self.body = RequestBody::Raw(text.into());
        self
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Response captured from the API under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, when present and readable.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: String,
    /// Time from send to fully read body.
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the body is not valid JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200 .. 300).contains(&self.status)
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client for the Books resource.
#[derive(Clone)]
pub struct BooksClient {
    /// Underlying transport.
    http: Client,
    /// Instrumentation filters run around every call.
    filters: FilterChain,
    /// Connect timeout the transport was built with.
    connection_timeout: Duration,
    /// Read timeout the transport was built with.
    socket_timeout: Duration,
}

impl fmt::Debug for BooksClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BooksClient").field("filters", &self.filters.len()).finish_non_exhaustive()
    }
}

impl BooksClient {
    /// Builds a client bounded by the template's timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the transport cannot be built.
    pub fn new(template: &RequestTemplate, filters: FilterChain) -> Result<Self, TransportError> {
        let http = Client::builder()
            .connect_timeout(template.connection_timeout())
            .read_timeout(template.socket_timeout())
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Ok(Self {
            http,
            filters,
            connection_timeout: template.connection_timeout(),
            socket_timeout: template.socket_timeout(),
        })
    }

    /// Builds a client for `template` that keeps this client's filter chain.
    ///
    /// Call records keep one sequence across the old and new client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the transport cannot be built.
    pub fn rebuilt_for(&self, template: &RequestTemplate) -> Result<Self, TransportError> {
        Self::new(template, self.filters.clone())
    }

    /// Returns the connect timeout the transport enforces.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the read timeout the transport enforces.
    #[must_use]
    pub const fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    /// Returns the installed filter chain.
    #[must_use]
    pub const fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Sends `call` using `template` defaults and returns the full response.
    ///
    /// `label` names the scenario in logs and reports.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL or body cannot be built, the
    /// connection fails, or a timeout elapses.
    pub async fn send(
        &self,
        template: &RequestTemplate,
        label: &str,
        call: &ApiCall,
    ) -> Result<ApiResponse, TransportError> {
        let url = template.url_for(&call.path)?;
        let body = call.body.encode()?;
        let request = PreparedRequest {
            sequence: self.filters.next_sequence(),
            label: label.to_string(),
            method: call.method,
            url,
            headers: template
                .headers()
                .iter()
                .map(|(name, value)| {
                    (name.to_string(), value.to_str().unwrap_or_default().to_string())
                })
                .collect(),
            body,
            log_detail: template.log_detail(),
        };
        self.filters.before_send(&request);

        let started = Instant::now();
        match self.execute(template, &request).await {
            Ok(mut response) => {
                response.elapsed = started.elapsed();
                self.filters.after_response(&request, &response);
                Ok(response)
            }
            Err(err) => {
                self.filters.after_failure(&request, &err, started.elapsed());
                Err(err)
            }
        }
    }

    /// Performs the HTTP exchange.
    async fn execute(
        &self,
        template: &RequestTemplate,
        request: &PreparedRequest,
    ) -> Result<ApiResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.to_reqwest(), request.url.clone())
            .headers(template.headers().clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            content_type,
            body,
            elapsed: Duration::ZERO,
        })
    }
}
