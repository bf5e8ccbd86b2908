// crates/books-contract/src/lib.rs
// ============================================================================
// Module: Books Contract Library
// Description: Configuration, request templates, and CRUD conformance oracle.
// Purpose: Shared building blocks for Books API contract scenarios.
// Dependencies: reqwest, jsonschema, serde, toml, tracing
// ============================================================================

//! ## Overview
//! `books-contract` drives HTTP contract scenarios against a remote Books
//! resource. Configuration is resolved from a TOML properties file with
//! environment overrides, turned into a shared read-only request template, and
//! consumed by a suite lifecycle that wires the HTTP client and its
//! instrumentation filters. Expected API behavior lives in the conformance
//! oracle as reusable expectation bundles, and scenarios are executed through
//! an explicit ordered pipeline.
//!
//! Remote responses are untrusted: every mismatch is surfaced as a typed
//! failure at the scenario boundary and never retried.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod model;
pub mod oracle;
pub mod report;
pub mod request;
pub mod scenario;
pub mod schemas;
pub mod suite;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ApiCall;
pub use client::ApiResponse;
pub use client::BooksClient;
pub use client::HttpMethod;
pub use client::RequestBody;
pub use config::ConfigResolver;
pub use config::EffectiveConfig;
pub use error::ConfigError;
pub use error::HarnessError;
pub use error::TransportError;
pub use lifecycle::CaseContext;
pub use lifecycle::SuiteContext;
pub use lifecycle::TestLifecycle;
pub use model::Book;
pub use oracle::ConformanceOracle;
pub use oracle::ContractViolation;
pub use oracle::ExpectationBundle;
pub use oracle::StatusExpectation;
pub use request::RequestSpecFactory;
pub use request::RequestTemplate;
pub use scenario::Scenario;
pub use scenario::ScenarioGroup;
pub use scenario::ScenarioPipeline;
pub use scenario::SuiteReport;
pub use schemas::SchemaCatalog;
pub use suite::books_suite;
