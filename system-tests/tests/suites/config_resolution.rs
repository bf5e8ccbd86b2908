// system-tests/tests/suites/config_resolution.rs
// ============================================================================
// Module: Config Resolution Tests
// Description: File and environment configuration driving real calls.
// Purpose: Prove resolved settings reach the wire, including after reset.
// Dependencies: books-contract, helpers, tempfile, toml
// ============================================================================

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Test suite helpers keep documentation concise."
)]

//! ## Overview
//! Writes TOML properties files to a temp dir, layers injected environment
//! overrides on top, and runs the smoke scenarios against a stub to confirm
//! the effective configuration is the one used for requests.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use books_contract::ConfigError;
use books_contract::ConfigResolver;
use books_contract::HarnessError;
use books_contract::RequestSpecFactory;
use books_contract::ScenarioGroup;
use books_contract::TestLifecycle;
use books_contract::books_suite;
use books_contract::config::MapEnv;
use books_contract::config::PropertySource;
use books_contract::config::env_key;
use books_contract::scenario::ScenarioFailure;
use books_contract::scenario::ScenarioOutcome;
use helpers::artifacts::TestReporter;
use helpers::books_stub::STUB_BASE_PATH;
use helpers::books_stub::StubBehavior;
use helpers::harness::start_stub_harness;

use crate::helpers;

/// Unroutable origin used where a request must never succeed.
const DEAD_ORIGIN: &str = "http://127.0.0.1:1";

fn require(condition: bool, context: &str) -> Result<(), Box<dyn Error>> {
    if condition { Ok(()) } else { Err(context.to_string().into()) }
}

fn write_properties(path: &Path, base_url: &str, base_path: &str) -> Result<(), Box<dyn Error>> {
    let mut base = toml::Table::new();
    base.insert("url".to_string(), toml::Value::String(base_url.to_string()));
    base.insert("path".to_string(), toml::Value::String(base_path.to_string()));
    let mut connection = toml::Table::new();
    connection.insert("timeout".to_string(), toml::Value::Integer(2_000));
    let mut socket = toml::Table::new();
    socket.insert("timeout".to_string(), toml::Value::Integer(5_000));
    let mut root = toml::Table::new();
    root.insert("base".to_string(), toml::Value::Table(base));
    root.insert("connection".to_string(), toml::Value::Table(connection));
    root.insert("socket".to_string(), toml::Value::Table(socket));
    fs::write(path, toml::to_string(&root)?)?;
    Ok(())
}

fn file_lifecycle(path: &Path, env: MapEnv) -> TestLifecycle {
    let resolver = ConfigResolver::new(PropertySource::File(path.to_path_buf()), Arc::new(env));
    TestLifecycle::new(Arc::new(RequestSpecFactory::new(Arc::new(resolver))))
}

#[tokio::test(flavor = "multi_thread")]
async fn properties_file_drives_requests() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("properties_file_drives_requests")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("books.toml");
    write_properties(&path, &harness.stub.base_url(), STUB_BASE_PATH)?;

    let suite = file_lifecycle(&path, MapEnv::new()).setup_suite()?;
    require(suite.config().base_path == STUB_BASE_PATH, "base path not taken from file")?;
    let report = books_suite(suite.config())?.select(&[ScenarioGroup::Smoke]).run(&suite).await;
    require(report.is_success(), "smoke scenarios failed under file config")?;

    reporter.finish("pass", vec!["file properties reached the wire".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
    ])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn environment_overrides_file_base_url() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("environment_overrides_file_base_url")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("books.toml");
    write_properties(&path, DEAD_ORIGIN, STUB_BASE_PATH)?;

    let env = MapEnv::new().with(env_key("base.url"), harness.stub.base_url());
    let suite = file_lifecycle(&path, env).setup_suite()?;
    let report = books_suite(suite.config())?.select(&[ScenarioGroup::Smoke]).run(&suite).await;
    require(report.is_success(), "environment base url was not used")?;
    require(
        suite.call_records().iter().all(|record| record.url.starts_with(&harness.stub.base_url())),
        "calls went to the file origin",
    )?;

    reporter.finish("pass", vec!["BASE_URL override won over the file".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
    ])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_rereads_changed_properties() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("reset_rereads_changed_properties")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("books.toml");
    write_properties(&path, &harness.stub.base_url(), "/wrong")?;

    let lifecycle = file_lifecycle(&path, MapEnv::new());
    let stale = lifecycle.setup_suite()?;
    let report = books_suite(stale.config())?.select(&[ScenarioGroup::Smoke]).run(&stale).await;
    require(
        matches!(
            report.outcome("smoke.read_fixture"),
            Some(ScenarioOutcome::Failed(ScenarioFailure::Contract(violation))) if violation.status == 404
        ),
        "wrong base path should miss the resource",
    )?;

    write_properties(&path, &harness.stub.base_url(), STUB_BASE_PATH)?;
    let cached = lifecycle.setup_suite()?;
    require(cached.config().base_path == "/wrong", "configuration re-read without reset")?;

    lifecycle.factory().reset();
    let fresh = lifecycle.setup_suite()?;
    let report = books_suite(fresh.config())?.select(&[ScenarioGroup::Smoke]).run(&fresh).await;
    require(report.is_success(), "reset did not pick up the corrected file")?;

    reporter.finish("pass", vec!["reset re-read the properties file".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
    ])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_base_url_aborts_setup() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("missing_base_url_aborts_setup")?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.toml");

    let result = file_lifecycle(&path, MapEnv::new()).setup_suite();
    require(
        matches!(result, Err(HarnessError::Config(ConfigError::Missing { .. }))),
        "setup should fail on a missing base url",
    )?;

    reporter.finish("pass", vec!["missing configuration stopped the suite".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
    ])?;
    Ok(())
}
