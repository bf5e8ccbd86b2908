// system-tests/tests/suites/books_lifecycle.rs
// ============================================================================
// Module: Books Lifecycle Tests
// Description: Full pipeline runs against a well-behaved Books stub.
// Purpose: Prove the harness passes a conforming API end to end.
// Dependencies: books-contract, helpers
// ============================================================================

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Test suite helpers keep documentation concise."
)]

//! ## Overview
//! Runs the Books pipeline against a conforming stub and checks both the
//! reported outcomes and the state the stub ends up in.

use std::error::Error;

use books_contract::ApiCall;
use books_contract::ScenarioGroup;
use books_contract::books_suite;
use books_contract::scenario::ScenarioOutcome;
use helpers::artifacts::TestReporter;
use helpers::books_stub::FIXTURE_COUNT;
use helpers::books_stub::StubBehavior;
use helpers::harness::start_stub_harness;

use crate::helpers;

fn require(condition: bool, context: &str) -> Result<(), Box<dyn Error>> {
    if condition { Ok(()) } else { Err(context.to_string().into()) }
}

#[tokio::test(flavor = "multi_thread")]
async fn full_suite_passes_against_conforming_api() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("full_suite_passes_against_conforming_api")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let suite = harness.lifecycle.setup_suite()?;
    let pipeline = books_suite(suite.config())?;

    let report = pipeline.run(&suite).await;
    reporter.record_suite(&report);
    reporter.artifacts().write_suite_report("suite_report.json", &report)?;
    reporter.artifacts().write_call_records("calls.jsonl", &suite.call_records())?;

    let failures: Vec<String> =
        report.failures().map(|(id, failure)| format!("{id}: {failure}")).collect();
    require(failures.is_empty(), &format!("unexpected failures: {failures:?}"))?;
    require(report.is_success(), "suite reported skipped scenarios")?;
    require(report.passed() == pipeline.len(), "not every scenario passed")?;
    require(suite.call_records().len() == pipeline.len(), "one call per scenario")?;
    require(harness.stub.book(suite.config().first_scenario_id).is_none(), "created book survived")?;
    require(
        usize::try_from(FIXTURE_COUNT).is_ok_and(|count| harness.stub.book_count() == count),
        "fixture set changed",
    )?;

    reporter.finish(
        "pass",
        vec![format!("{} scenarios passed", report.passed())],
        vec![
            "summary.json".to_string(),
            "summary.md".to_string(),
            "suite_report.json".to_string(),
            "calls.jsonl".to_string(),
        ],
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn created_book_round_trips_verbatim() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("created_book_round_trips_verbatim")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let suite = harness.lifecycle.setup_suite()?;
    let pipeline = books_suite(suite.config())?;
    let positive = pipeline.select(&[ScenarioGroup::Positive]);

    let create = pipeline.get("positive.create").ok_or("missing create scenario")?;
    let created = positive.run(&suite).await;
    require(created.is_success(), "positive lifecycle failed")?;

    let records = suite.call_records();
    let create_record = records
        .iter()
        .find(|record| record.scenario == "positive.create")
        .ok_or("create call not recorded")?;
    let sent: serde_json::Value =
        serde_json::from_str(create_record.request_body.as_deref().ok_or("no request body")?)?;
    let echoed: serde_json::Value =
        serde_json::from_str(create_record.response_body.as_deref().ok_or("no response body")?)?;
    require(sent == echoed, "create echo differs from request")?;
    require(
        matches!(&create.call.body, books_contract::RequestBody::Json(body) if *body == sent),
        "request body differs from scenario payload",
    )?;

    reporter.artifacts().write_call_records("calls.jsonl", &records)?;
    reporter.finish("pass", vec!["create echo matched request".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
        "calls.jsonl".to_string(),
    ])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_reads_are_identical() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("repeated_reads_are_identical")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let suite = harness.lifecycle.setup_suite()?;
    let case = suite.begin_case("idempotent_read")?;

    let first = case.send(&ApiCall::get("/Books/1")).await?;
    let second = case.send(&ApiCall::get("/Books/1")).await?;
    require(first.status == 200, "fixture read failed")?;
    require(first.json()? == second.json()?, "repeated reads differ")?;

    reporter.finish("pass", vec!["two reads returned identical fields".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
    ])?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn smoke_selection_sends_only_smoke_calls() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("smoke_selection_sends_only_smoke_calls")?;
    let harness = start_stub_harness(StubBehavior::default()).await?;
    let suite = harness.lifecycle.setup_suite()?;
    let smoke = books_suite(suite.config())?.select(&[ScenarioGroup::Smoke]);

    let requests_before = harness.stub.requests().len();
    let report = smoke.run(&suite).await;
    require(report.is_success(), "smoke scenarios failed")?;
    require(report.by_group(ScenarioGroup::Smoke).count() == 2, "expected two smoke scenarios")?;
    require(
        matches!(report.outcome("smoke.read_fixture"), Some(ScenarioOutcome::Passed { status: 200, .. })),
        "fixture read did not pass with 200",
    )?;
    let sent = harness.stub.requests().len() - requests_before;
    require(sent == 2, &format!("expected 2 requests, stub saw {sent}"))?;

    reporter.finish("pass", vec!["smoke selection sent two calls".to_string()], vec![
        "summary.json".to_string(),
        "summary.md".to_string(),
    ])?;
    Ok(())
}
