// crates/books-contract/src/lifecycle.rs
// ============================================================================
// Module: Test Lifecycle
// Description: Per-suite and per-case setup for contract scenarios.
// Purpose: Wire configuration, the HTTP client, and filters before calls.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! [`TestLifecycle::setup_suite`] runs once per suite: it resolves
//! configuration, compiles the schemas, and builds the shared client with the
//! fixed filter chain (reporting, request logging, response logging). A
//! configuration failure aborts the suite here, before any scenario runs.
//!
//! [`SuiteContext::begin_case`] runs once per case and fetches the current
//! request template from the factory. When a factory reset has replaced the
//! template, the client is rebuilt so the case runs with the new timeouts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tracing_subscriber::EnvFilter;

use crate::client::ApiCall;
use crate::client::ApiResponse;
use crate::client::BooksClient;
use crate::config::EffectiveConfig;
use crate::error::HarnessError;
use crate::error::TransportError;
use crate::filters::FilterChain;
use crate::oracle::ExpectationBundle;
use crate::report::CallRecord;
use crate::report::FileReportSink;
use crate::report::MemoryReportSink;
use crate::report::ReportSink;
use crate::report::StderrReportSink;
use crate::request::RequestSpecFactory;
use crate::request::RequestTemplate;
use crate::scenario::ScenarioFailure;
use crate::schemas::SchemaCatalog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `report.path` value that streams call records to stderr.
pub const STDERR_REPORT_PATH: &str = "-";
/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG` and writes through the test writer so libtest captures
/// output. Later calls are no-ops.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Suite and case setup over an injected request factory.
pub struct TestLifecycle {
    /// Factory supplying configuration and the request template.
    factory: Arc<RequestSpecFactory>,
    /// Additional report sinks installed alongside the defaults.
    extra_sinks: Vec<Arc<dyn ReportSink>>,
}

impl TestLifecycle {
    /// Creates a lifecycle over `factory`.
    #[must_use]
    pub fn new(factory: Arc<RequestSpecFactory>) -> Self {
        Self {
            factory,
            extra_sinks: Vec::new(),
        }
    }

    /// Adds a report sink that receives every call record.
    #[must_use]
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    /// Returns the request factory.
    #[must_use]
    pub const fn factory(&self) -> &Arc<RequestSpecFactory> {
        &self.factory
    }

    /// Prepares a suite: configuration, schemas, client, and filters.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when configuration cannot be resolved, the
    /// report file cannot be opened, the client cannot be built, or a schema
    /// fails to compile.
    pub fn setup_suite(&self) -> Result<SuiteContext, HarnessError> {
        let config = self.factory.resolver().effective()?;
        let template = self.factory.request_template()?;

        let records = Arc::new(MemoryReportSink::new());
        let mut sinks: Vec<Arc<dyn ReportSink>> = vec![records.clone()];
        sinks.extend(self.extra_sinks.iter().cloned());
        if let Some(path) = &config.report_path {
            if path.as_os_str() == STDERR_REPORT_PATH {
                sinks.push(Arc::new(StderrReportSink));
            } else {
                let sink = FileReportSink::new(path)
                    .map_err(|err| HarnessError::Report(format!("{}: {err}", path.display())))?;
                sinks.push(Arc::new(sink));
            }
        }

        let filters = FilterChain::standard(sinks, config.response_logging);
        let client = BooksClient::new(&template, filters)?;
        let schemas = Arc::new(SchemaCatalog::compile()?);
        tracing::info!(
            base_url = %config.base_url,
            base_path = %config.base_path,
            connection_timeout_ms = config.connection_timeout.as_millis(),
            socket_timeout_ms = config.socket_timeout.as_millis(),
            "suite ready"
        );
        Ok(SuiteContext {
            config,
            factory: Arc::clone(&self.factory),
            client: Mutex::new(BoundClient {
                template,
                client,
            }),
            schemas,
            records,
        })
    }
}

// ============================================================================
// SECTION: Suite Context
// ============================================================================

/// State shared by every case of one suite.
pub struct SuiteContext {
    /// Effective configuration at setup time.
    config: Arc<EffectiveConfig>,
    /// Template source for each case.
    factory: Arc<RequestSpecFactory>,
    /// Client plus the template whose timeouts it was built with.
    client: Mutex<BoundClient>,
    /// Compiled schemas.
    schemas: Arc<SchemaCatalog>,
    /// In-memory copy of every call record.
    records: Arc<MemoryReportSink>,
}

impl SuiteContext {
    /// Returns the effective configuration.
    #[must_use]
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Returns the compiled schemas.
    #[must_use]
    pub fn schemas(&self) -> &SchemaCatalog {
        &self.schemas
    }

    /// Returns a handle to the current client.
    #[must_use]
    pub fn client(&self) -> BooksClient {
        self.client.lock().unwrap_or_else(PoisonError::into_inner).client.clone()
    }

    /// Returns every call recorded so far, in call order.
    #[must_use]
    pub fn call_records(&self) -> Vec<CallRecord> {
        self.records.records()
    }

    /// Starts a case named `name` with the current request template.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioFailure::Setup`] when the template cannot be built
    /// and [`ScenarioFailure::Transport`] when the client cannot be rebuilt
    /// for a changed template.
    pub fn begin_case(&self, name: &str) -> Result<CaseContext<'_>, ScenarioFailure> {
        let template = self.factory.request_template()?;
        let client = {
            let mut bound = self.client.lock().unwrap_or_else(PoisonError::into_inner);
            if !Arc::ptr_eq(&bound.template, &template) {
                bound.client = bound.client.rebuilt_for(&template)?;
                bound.template = Arc::clone(&template);
                tracing::debug!(
                    case = name,
                    connection_timeout_ms = template.connection_timeout().as_millis(),
                    socket_timeout_ms = template.socket_timeout().as_millis(),
                    "rebuilt client for new template"
                );
            }
            bound.client.clone()
        };
        tracing::debug!(case = name, "begin case");
        Ok(CaseContext {
            suite: self,
            name: name.to_string(),
            template,
            client,
        })
    }
}

/// Client paired with the template it was built from.
struct BoundClient {
    /// Template whose timeouts the client enforces.
    template: Arc<RequestTemplate>,
    /// Client built from `template`.
    client: BooksClient,
}

// ============================================================================
// SECTION: Case Context
// ============================================================================

/// One case: a name plus the template borrowed for its calls.
pub struct CaseContext<'a> {
    /// Owning suite.
    suite: &'a SuiteContext,
    /// Case name used as the report label.
    name: String,
    /// Template fetched at case start.
    template: Arc<RequestTemplate>,
    /// Client matching `template`.
    client: BooksClient,
}

impl CaseContext<'_> {
    /// Returns the case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the template used by this case.
    #[must_use]
    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    /// Returns the client used by this case.
    #[must_use]
    pub const fn client(&self) -> &BooksClient {
        &self.client
    }

    /// Sends `call` without asserting on the response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on transport failure.
    pub async fn send(&self, call: &ApiCall) -> Result<ApiResponse, TransportError> {
        self.client.send(&self.template, &self.name, call).await
    }

    /// Sends `call` and verifies the response against `expectation`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioFailure::Transport`] on transport failure and
    /// [`ScenarioFailure::Contract`] when the bundle is not satisfied.
    pub async fn check(
        &self,
        call: &ApiCall,
        expectation: &ExpectationBundle,
    ) -> Result<ApiResponse, ScenarioFailure> {
        let response = self.send(call).await?;
        expectation.verify(&response, &self.suite.schemas)?;
        Ok(response)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
