// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Per-test artifact folders and run summaries.
// Purpose: Leave a readable record of every system-test run on disk.
// Dependencies: system-tests, books-contract, serde, serde_jcs
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use books_contract::SuiteReport;
use books_contract::report::CallRecord;
use books_contract::scenario::ReportSummary;
use serde::Serialize;
use system_tests::config::SystemTestConfig;

/// File name of the canonical JSON summary.
const SUMMARY_JSON: &str = "summary.json";
/// File name of the Markdown summary.
const SUMMARY_MD: &str = "summary.md";

/// Wall-clock milliseconds since the Unix epoch; 0 if the clock is earlier.
fn epoch_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis())
}

/// Folder owned by one test under the run root.
#[derive(Debug, Clone)]
pub struct TestArtifacts {
    /// Folder that receives this test's files.
    dir: PathBuf,
}

impl TestArtifacts {
    /// Creates `<run root>/<test name>`.
    ///
    /// Refuses a folder that already holds files unless
    /// `BOOKS_SYSTEM_TEST_ALLOW_OVERWRITE` is set.
    pub fn new(test_name: &str) -> io::Result<Self> {
        let config = SystemTestConfig::load().map_err(io::Error::other)?;
        let run_root = config
            .run_root
            .unwrap_or_else(|| Path::new("target").join("system-tests").join(format!("run_{}", epoch_millis())));
        let dir = run_root.join(test_name);
        let occupied = fs::read_dir(&dir).is_ok_and(|mut entries| entries.next().is_some());
        if occupied && !config.allow_overwrite {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already holds artifacts", dir.display()),
            ));
        }
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
        })
    }

    /// Returns the artifact folder.
    pub fn root(&self) -> &Path {
        &self.dir
    }

    /// Writes `value` as RFC 8785 canonical JSON.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let bytes = serde_jcs::to_vec(value).map_err(io::Error::other)?;
        self.write_bytes(name, &bytes)
    }

    /// Writes a UTF-8 text file.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        self.write_bytes(name, value.as_bytes())
    }

    /// Writes one JSON call record per line.
    pub fn write_call_records(&self, name: &str, records: &[CallRecord]) -> io::Result<PathBuf> {
        let lines = records
            .iter()
            .map(|record| serde_json::to_string(record).map(|line| line + "\n"))
            .collect::<Result<String, _>>()
            .map_err(io::Error::other)?;
        self.write_text(name, &lines)
    }

    /// Writes the per-scenario outcome table of a suite run.
    pub fn write_suite_report(&self, name: &str, report: &SuiteReport) -> io::Result<PathBuf> {
        self.write_json(name, &report.summary())
    }

    /// Writes `bytes` to `name` inside the folder.
    fn write_bytes(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Contents of `summary.json`.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    /// Test name.
    test_name: &'a str,
    /// Final status label.
    status: &'a str,
    /// Start time in epoch milliseconds.
    started_at_ms: u128,
    /// Run time in milliseconds.
    duration_ms: u128,
    /// Free-form notes.
    notes: &'a [String],
    /// Artifact file names.
    artifacts: &'a [String],
    /// Scenario outcome counts, when a suite ran.
    suite: Option<&'a ReportSummary>,
}

/// Writes `summary.json` and `summary.md` when the test ends.
///
/// A test that returns early or panics still gets a summary from `Drop`.
pub struct TestReporter {
    /// Artifact folder.
    artifacts: TestArtifacts,
    /// Test name.
    test_name: String,
    /// Start time in epoch milliseconds.
    started_at_ms: u128,
    /// Recorded suite outcome.
    suite: Option<ReportSummary>,
    /// Set once the summaries are written.
    finished: bool,
}

impl TestReporter {
    /// Opens the artifact folder for `test_name`.
    pub fn new(test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: TestArtifacts::new(test_name)?,
            test_name: test_name.to_string(),
            started_at_ms: epoch_millis(),
            suite: None,
            finished: false,
        })
    }

    /// Returns the artifact folder.
    pub fn artifacts(&self) -> &TestArtifacts {
        &self.artifacts
    }

    /// Includes the outcome counts of `report` in the final summary.
    pub fn record_suite(&mut self, report: &SuiteReport) {
        self.suite = Some(report.summary());
    }

    /// Writes the summaries with `status`, `notes`, and the listed artifacts.
    pub fn finish(
        &mut self,
        status: &str,
        notes: Vec<String>,
        artifacts: Vec<String>,
    ) -> io::Result<()> {
        let summary = RunSummary {
            test_name: &self.test_name,
            status,
            started_at_ms: self.started_at_ms,
            duration_ms: epoch_millis().saturating_sub(self.started_at_ms),
            notes: &notes,
            artifacts: &artifacts,
            suite: self.suite.as_ref(),
        };
        self.artifacts.write_json(SUMMARY_JSON, &summary)?;
        self.artifacts.write_text(SUMMARY_MD, &render_markdown(&summary))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if !self.finished {
            let status = if std::thread::panicking() { "panic" } else { "incomplete" };
            let _ = self.finish(status, vec!["test ended before finish".to_string()], Vec::new());
        }
    }
}

/// Renders `summary.md`.
fn render_markdown(summary: &RunSummary<'_>) -> String {
    let mut out = format!("# {}\n\n", summary.test_name);
    let _ = writeln!(out, "Status: **{}** in {} ms", summary.status, summary.duration_ms);
    if let Some(suite) = summary.suite {
        let _ = write!(
            out,
            "\n## Scenarios\n\n{} total, {} passed, {} failed, {} skipped\n\n",
            suite.total, suite.passed, suite.failed, suite.skipped
        );
        out.push_str("| id | group | outcome | status |\n|---|---|---|---|\n");
        for row in &suite.scenarios {
            let status = row.status.map_or_else(|| "-".to_string(), |code| code.to_string());
            let _ = writeln!(out, "| {} | {} | {} | {status} |", row.id, row.group, row.outcome);
        }
    }
    for (heading, items) in [("Notes", summary.notes), ("Artifacts", summary.artifacts)] {
        if !items.is_empty() {
            let _ = write!(out, "\n## {heading}\n\n");
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
        }
    }
    out
}
