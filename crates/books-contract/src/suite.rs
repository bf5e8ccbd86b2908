// crates/books-contract/src/suite.rs
// ============================================================================
// Module: Books Suite
// Description: The CRUD lifecycle and negative battery for the Books resource.
// Purpose: Apply the conformance oracle to concrete endpoints and payloads.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`books_suite`] assembles the full pipeline:
//! - smoke: read the collection and a fixture book;
//! - positive: create, read back twice, update, read back, delete, confirm
//!   absence;
//! - negative: update/delete after delete, absent ids, malformed path ids,
//!   duplicate id, and one scenario per payload defect for create and update.
//!
//! Created books take ids from an [`IdAllocator`], which never returns a
//! fixture id (1 through 200) and never returns the same id twice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use serde_json::Value;
use serde_json::json;
use time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::client::ApiCall;
use crate::client::HttpMethod;
use crate::client::RequestBody;
use crate::config::EffectiveConfig;
use crate::model::Book;
use crate::model::format_publish_date;
use crate::oracle::ConformanceOracle;
use crate::oracle::PayloadDefect;
use crate::scenario::PipelineError;
use crate::scenario::Scenario;
use crate::scenario::ScenarioGroup;
use crate::scenario::ScenarioPipeline;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixture book expected to exist on every target.
pub const FIXTURE_BOOK_ID: i64 = 1;
/// Highest id reserved for fixture data.
pub const FIXTURE_MAX_ID: i64 = 200;
/// Collection path.
pub const BOOKS_PATH: &str = "/Books";
/// Path id that is not numeric.
pub const NON_NUMERIC_ID: &str = "invalid-id";
/// Path id that is numeric but negative.
pub const NEGATIVE_ID: &str = "-1";
/// Publish date of the created book; the update moves it forward.
const SAMPLE_PUBLISHED: OffsetDateTime = datetime!(2025-10-18 14:22:07.735 UTC);

/// Defects exercised against `POST /Books`.
const CREATE_DEFECTS: [PayloadDefect; 9] = [
    PayloadDefect::EmptyObject,
    PayloadDefect::MissingId,
    PayloadDefect::MissingTitle,
    PayloadDefect::NullTitle,
    PayloadDefect::NonNumericId,
    PayloadDefect::NonNumericPageCount,
    PayloadDefect::NegativePageCount,
    PayloadDefect::InvalidDate,
    PayloadDefect::MalformedJson,
];

/// Defects exercised against `PUT /Books/{id}`.
const UPDATE_DEFECTS: [PayloadDefect; 8] = [
    PayloadDefect::EmptyObject,
    PayloadDefect::MissingId,
    PayloadDefect::NonNumericId,
    PayloadDefect::NonNumericPageCount,
    PayloadDefect::NegativePageCount,
    PayloadDefect::InvalidDate,
    PayloadDefect::MalformedJson,
    PayloadDefect::IdMismatch,
];

// ============================================================================
// SECTION: Id Allocation
// ============================================================================

/// Hands out unique ids above the fixture range.
#[derive(Debug)]
pub struct IdAllocator {
    /// Next id to return.
    next: AtomicI64,
}

impl IdAllocator {
    /// Creates an allocator starting at `first`, raised past the fixture range.
    #[must_use]
    pub fn new(first: i64) -> Self {
        let start = if first <= FIXTURE_MAX_ID {
            tracing::warn!(requested = first, start = FIXTURE_MAX_ID + 1, "first id overlaps fixtures");
            FIXTURE_MAX_ID + 1
        } else {
            first
        };
        Self {
            next: AtomicI64::new(start),
        }
    }

    /// Returns the next unused id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IdsExhausted`] once the next id would overflow;
    /// `i64::MAX` itself is never handed out.
    pub fn next_id(&self) -> Result<i64, PipelineError> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .map_err(|last| PipelineError::IdsExhausted {
                last,
            })
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Book created by the positive lifecycle.
#[must_use]
pub fn sample_book(id: i64) -> Book {
    Book::builder(id)
        .title("Test Book")
        .description("Test Description")
        .page_count(100)
        .excerpt("Test Excerpt")
        .publish_date(wire_date(SAMPLE_PUBLISHED))
        .build()
}

/// Replacement body used by the positive update.
#[must_use]
pub fn updated_book(id: i64) -> Book {
    Book::builder(id)
        .title("Updated Book")
        .description("Updated Description")
        .page_count(200)
        .excerpt("Updated Excerpt")
        .publish_date(wire_date(SAMPLE_PUBLISHED + Duration::minutes(3)))
        .build()
}

/// Formats a fixture timestamp; four-digit UTC years always format.
fn wire_date(at: OffsetDateTime) -> String {
    format_publish_date(at).unwrap_or_default()
}

/// Builds a request body that carries `defect`, derived from `book`.
///
/// For [`PayloadDefect::IdMismatch`] the body is `book` unchanged; the caller
/// sends it to a path naming a different id.
#[must_use]
pub fn defect_body(defect: PayloadDefect, book: &Book) -> RequestBody {
    let mut body = book.to_json();
    match defect {
        PayloadDefect::EmptyObject => return RequestBody::Json(json!({})),
        PayloadDefect::MalformedJson => {
            return RequestBody::Raw(format!(
                "{{\"id\": {},\"title\": \"{}\"\"description\": \"Malformed JSON\",\"pageCount\": {},\"excerpt\": \"{}\",\"publishDate\": \"{}\"}}",
                book.id, book.title, book.page_count, book.excerpt, book.publish_date
            ));
        }
        PayloadDefect::MissingId => remove(&mut body, "id"),
        PayloadDefect::MissingTitle => remove(&mut body, "title"),
        PayloadDefect::NullTitle => body["title"] = Value::Null,
        PayloadDefect::NonNumericId => body["id"] = json!(NON_NUMERIC_ID),
        PayloadDefect::NonNumericPageCount => body["pageCount"] = json!("not-a-number"),
        PayloadDefect::NegativePageCount => body["pageCount"] = json!(-1),
        PayloadDefect::InvalidDate => body["publishDate"] = json!("invalid-date-format"),
        PayloadDefect::IdMismatch => {}
    }
    RequestBody::Json(body)
}

/// Drops a top-level field.
fn remove(body: &mut Value, field: &str) {
    if let Some(object) = body.as_object_mut() {
        object.remove(field);
    }
}

/// Snake-case label used in scenario ids.
const fn defect_slug(defect: PayloadDefect) -> &'static str {
    match defect {
        PayloadDefect::EmptyObject => "empty_object",
        PayloadDefect::MissingId => "missing_id",
        PayloadDefect::MissingTitle => "missing_title",
        PayloadDefect::NullTitle => "null_title",
        PayloadDefect::NonNumericId => "non_numeric_id",
        PayloadDefect::NonNumericPageCount => "non_numeric_page_count",
        PayloadDefect::NegativePageCount => "negative_page_count",
        PayloadDefect::InvalidDate => "invalid_date",
        PayloadDefect::MalformedJson => "malformed_json",
        PayloadDefect::IdMismatch => "id_mismatch",
    }
}

/// Path of a single book.
fn book_path(id: impl std::fmt::Display) -> String {
    format!("{BOOKS_PATH}/{id}")
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Builds the Books pipeline with ids starting at the configured first id.
///
/// # Errors
///
/// Returns [`PipelineError`] if the scenario graph is inconsistent.
pub fn books_suite(config: &EffectiveConfig) -> Result<ScenarioPipeline, PipelineError> {
    books_suite_with(&IdAllocator::new(config.first_scenario_id))
}

/// Builds the Books pipeline drawing ids from `ids`.
///
/// # Errors
///
/// Returns [`PipelineError`] if the scenario graph is inconsistent.
pub fn books_suite_with(ids: &IdAllocator) -> Result<ScenarioPipeline, PipelineError> {
    use ScenarioGroup::Negative;
    use ScenarioGroup::Positive;
    use ScenarioGroup::Smoke;

    let created = sample_book(ids.next_id()?);
    let updated = updated_book(created.id);
    let absent = ids.next_id()?;
    let duplicate = Book::builder(FIXTURE_BOOK_ID)
        .title("Duplicate ID Book")
        .description("Attempting to create with existing ID")
        .page_count(250)
        .excerpt("This should fail")
        .publish_date(wire_date(SAMPLE_PUBLISHED + Duration::minutes(13)))
        .build();

    let mut builder = ScenarioPipeline::builder()
        .add(Scenario::new(
            "smoke.read_collection",
            Smoke,
            ApiCall::get(BOOKS_PATH),
            ConformanceOracle::read_collection(),
        ))
        .add(Scenario::new(
            "smoke.read_fixture",
            Smoke,
            ApiCall::get(book_path(FIXTURE_BOOK_ID)),
            ConformanceOracle::read_existing(FIXTURE_BOOK_ID),
        ))
        .add(Scenario::new(
            "positive.create",
            Positive,
            ApiCall::post(BOOKS_PATH, created.to_json()),
            ConformanceOracle::create_echo(&created),
        ))
        .add(
            Scenario::new(
                "positive.read_created",
                Positive,
                ApiCall::get(book_path(created.id)),
                ConformanceOracle::read_echo(&created),
            )
            .after("positive.create"),
        )
        .add(
            Scenario::new(
                "positive.read_created_again",
                Positive,
                ApiCall::get(book_path(created.id)),
                ConformanceOracle::read_echo(&created),
            )
            .described(format!("idempotent read of book {}", created.id))
            .after("positive.read_created"),
        )
        .add(
            Scenario::new(
                "positive.update",
                Positive,
                ApiCall::put(book_path(updated.id), updated.to_json()),
                ConformanceOracle::update_echo(&updated),
            )
            .after("positive.read_created"),
        )
        .add(
            Scenario::new(
                "positive.read_updated",
                Positive,
                ApiCall::get(book_path(updated.id)),
                ConformanceOracle::read_echo(&updated),
            )
            .after("positive.update"),
        )
        .add(
            Scenario::new(
                "positive.delete",
                Positive,
                ApiCall::delete(book_path(updated.id)),
                ConformanceOracle::delete_existing(),
            )
            .after("positive.read_updated"),
        )
        .add(
            Scenario::new(
                "positive.read_deleted",
                Positive,
                ApiCall::get(book_path(updated.id)),
                ConformanceOracle::read_absent(),
            )
            .described(format!("book {} is gone after delete", updated.id))
            .after("positive.delete"),
        )
        .add(
            Scenario::new(
                "negative.update_deleted",
                Negative,
                ApiCall::put(book_path(updated.id), updated.to_json()),
                ConformanceOracle::update_absent(),
            )
            .after("positive.delete"),
        )
        .add(
            Scenario::new(
                "negative.delete_deleted",
                Negative,
                ApiCall::delete(book_path(updated.id)),
                ConformanceOracle::delete_absent(),
            )
            .after("positive.delete"),
        )
        .add(Scenario::new(
            "negative.read_absent",
            Negative,
            ApiCall::get(book_path(absent)),
            ConformanceOracle::read_absent(),
        ))
        .add(Scenario::new(
            "negative.update_absent",
            Negative,
            ApiCall::put(book_path(absent), sample_book(absent).to_json()),
            ConformanceOracle::update_absent(),
        ))
        .add(Scenario::new(
            "negative.delete_absent",
            Negative,
            ApiCall::delete(book_path(absent)),
            ConformanceOracle::delete_absent(),
        ))
        .add(Scenario::new(
            "negative.create_duplicate",
            Negative,
            ApiCall::post(BOOKS_PATH, duplicate.to_json()),
            ConformanceOracle::create_duplicate(),
        ));

    for (label, id) in [("non_numeric", NON_NUMERIC_ID), ("negative", NEGATIVE_ID)] {
        builder = builder
            .add(Scenario::new(
                format!("negative.read_{label}_id"),
                Negative,
                ApiCall::get(book_path(id)),
                ConformanceOracle::read_malformed_id(),
            ))
            .add(Scenario::new(
                format!("negative.delete_{label}_id"),
                Negative,
                ApiCall::delete(book_path(id)),
                ConformanceOracle::delete_malformed_id(),
            ));
    }

    for defect in CREATE_DEFECTS {
        let book = sample_book(ids.next_id()?);
        builder = builder.add(Scenario::new(
            format!("negative.create_{}", defect_slug(defect)),
            Negative,
            ApiCall::new(HttpMethod::Post, BOOKS_PATH, defect_body(defect, &book)),
            ConformanceOracle::create_rejected(defect),
        ));
    }

    for defect in UPDATE_DEFECTS {
        let body_id = if defect == PayloadDefect::IdMismatch { ids.next_id()? } else { FIXTURE_BOOK_ID };
        let book = updated_book(body_id);
        builder = builder.add(Scenario::new(
            format!("negative.update_{}", defect_slug(defect)),
            Negative,
            ApiCall::new(HttpMethod::Put, book_path(FIXTURE_BOOK_ID), defect_body(defect, &book)),
            ConformanceOracle::update_rejected(defect),
        ));
    }

    builder.build()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
