// crates/books-contract/src/report.rs
// ============================================================================
// Module: Call Reports
// Description: Structured per-call records and their sinks.
// Purpose: Emit call/response reports without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every HTTP call made during a suite produces one [`CallRecord`]. Records
//! are routed to a [`ReportSink`]: JSON lines on stderr, an append-only JSON
//! lines file, or an in-memory buffer that suites snapshot for artifacts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::client::HttpMethod;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structured record of one HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Per-suite call sequence number.
    pub sequence: u64,
    /// Scenario label.
    pub scenario: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Full request URL.
    pub url: String,
    /// Request body as sent.
    pub request_body: Option<String>,
    /// Response status, absent on transport failure.
    pub status: Option<u16>,
    /// Response content type.
    pub content_type: Option<String>,
    /// Response body.
    pub response_body: Option<String>,
    /// Elapsed time in milliseconds.
    pub duration_ms: u128,
    /// Transport error message, when the call failed.
    pub error: Option<String>,
}

impl CallRecord {
    /// Creates a record with a consistent timestamp and no response data.
    #[must_use]
    pub fn new(sequence: u64, scenario: &str, method: HttpMethod, url: &str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "books_call",
            timestamp_ms,
            sequence,
            scenario: scenario.to_string(),
            method,
            url: url.to_string(),
            request_body: None,
            status: None,
            content_type: None,
            response_body: None,
            duration_ms: 0,
            error: None,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for call records.
pub trait ReportSink: Send + Sync {
    /// Record one call.
    fn record(&self, record: &CallRecord);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that logs JSON lines to stderr.
pub struct StderrReportSink;

impl ReportSink for StderrReportSink {
    fn record(&self, record: &CallRecord) {
        if let Ok(payload) = serde_json::to_string(record) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileReportSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileReportSink {
    /// Opens the report file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ReportSink for FileReportSink {
    fn record(&self, record: &CallRecord) {
        if let Ok(payload) = serde_json::to_string(record)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps records in memory.
#[derive(Default)]
pub struct MemoryReportSink {
    /// Captured records in call order.
    records: Mutex<Vec<CallRecord>>,
}

impl MemoryReportSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the captured records.
    #[must_use]
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ReportSink for MemoryReportSink {
    fn record(&self, record: &CallRecord) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
