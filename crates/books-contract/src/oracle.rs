// crates/books-contract/src/oracle.rs
// ============================================================================
// Module: Conformance Oracle
// Description: Expected Books API behavior as reusable expectation bundles.
// Purpose: One assertion protocol per operation and precondition.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`ExpectationBundle`] names a status expectation, an optional JSON
//! content-type requirement, a body shape, a schema, and field checks.
//! [`ExpectationBundle::verify`] evaluates every assertion and reports all
//! mismatches at once as a [`ContractViolation`].
//!
//! [`ConformanceOracle`] is the table of bundles for the Books resource. Where
//! HTTP under-constrains the status code the bundle carries an explicit
//! any-of set; successful reads and writes are held to the strict schemas.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::client::ApiResponse;
use crate::model::Book;
use crate::model::parse_publish_date;
use crate::request::JSON_MEDIA_TYPE;
use crate::schemas::SchemaCatalog;
use crate::schemas::SchemaRef;

// ============================================================================
// SECTION: Status Sets
// ============================================================================

/// Accepted statuses when creating a book whose id is already in use.
pub const CONFLICT_STATUSES: &[u16] = &[400, 409, 422];
/// Accepted statuses for a well-formed JSON payload failing validation.
pub const INVALID_PAYLOAD_STATUSES: &[u16] = &[400, 422];
/// Accepted statuses for a body that is not valid JSON.
pub const MALFORMED_JSON_STATUSES: &[u16] = &[400, 422, 500];
/// Accepted statuses for a path id that is not a valid identifier.
pub const MALFORMED_ID_STATUSES: &[u16] = &[400, 404];
/// Accepted statuses when the path id and body id disagree.
pub const ID_MISMATCH_STATUSES: &[u16] = &[400, 409, 422];

/// Fields every book response must carry with a non-null value.
const REQUIRED_FIELDS: [&str; 6] = ["id", "title", "description", "pageCount", "excerpt", "publishDate"];

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// Expected HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusExpectation {
    /// Exactly this status.
    Exactly(u16),
    /// Any status in the set.
    AnyOf(&'static [u16]),
}

impl StatusExpectation {
    /// Returns true when `status` satisfies the expectation.
    #[must_use]
    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::Exactly(expected) => *expected == status,
            Self::AnyOf(allowed) => allowed.contains(&status),
        }
    }
}

impl fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(expected) => write!(f, "{expected}"),
            Self::AnyOf(allowed) => {
                let codes = allowed.iter().map(u16::to_string).collect::<Vec<_>>();
                write!(f, "any of [{}]", codes.join(", "))
            }
        }
    }
}

/// Expected top-level JSON shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyShape {
    /// Body is not inspected.
    #[default]
    Any,
    /// A JSON object.
    Object,
    /// A JSON array with at least one element.
    NonEmptyArray,
}

/// Assertion on a top-level field of a JSON object body.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCheck {
    /// Field equals the expected JSON value.
    Equals {
        /// Field name.
        field: &'static str,
        /// Expected value.
        expected: Value,
    },
    /// Field is present and not null.
    NotNull(&'static str),
    /// Field is a wire-format publish date naming a real instant.
    PublishDate(&'static str),
}

/// Named set of assertions bound to one scenario outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationBundle {
    /// Bundle name used in reports.
    name: String,
    /// Status expectation.
    status: StatusExpectation,
    /// Require a JSON content type.
    json: bool,
    /// Expected body shape.
    shape: BodyShape,
    /// Schema the body must satisfy.
    schema: Option<SchemaRef>,
    /// Field-level checks.
    fields: Vec<FieldCheck>,
}

impl ExpectationBundle {
    /// Creates a bundle asserting only the status.
    #[must_use]
    pub fn new(name: impl Into<String>, status: StatusExpectation) -> Self {
        Self {
            name: name.into(),
            status,
            json: false,
            shape: BodyShape::Any,
            schema: None,
            fields: Vec::new(),
        }
    }

    /// Requires a content type containing `application/json`.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Requires the body to match `schema`.
    #[must_use]
    pub const fn schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Requires the top-level body shape.
    #[must_use]
    pub const fn shape(mut self, shape: BodyShape) -> Self {
        self.shape = shape;
        self
    }

    /// Requires `field` to equal `expected`.
    #[must_use]
    pub fn field_equals(mut self, field: &'static str, expected: Value) -> Self {
        self.fields.push(FieldCheck::Equals {
            field,
            expected,
        });
        self
    }

    /// Requires `field` to be present and non-null.
    #[must_use]
    pub fn field_not_null(mut self, field: &'static str) -> Self {
        self.fields.push(FieldCheck::NotNull(field));
        self
    }

    /// Requires `field` to hold a parseable wire-format publish date.
    #[must_use]
    pub fn field_publish_date(mut self, field: &'static str) -> Self {
        self.fields.push(FieldCheck::PublishDate(field));
        self
    }

    /// Returns the bundle name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the status expectation.
    #[must_use]
    pub const fn status(&self) -> StatusExpectation {
        self.status
    }

    /// Returns true when the bundle inspects the response body.
    fn inspects_body(&self) -> bool {
        self.shape != BodyShape::Any || self.schema.is_some() || !self.fields.is_empty()
    }

    /// Evaluates every assertion against `response`.
    ///
    /// A status mismatch stops evaluation: the body of an unexpected status
    /// is not held to the success contract.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation`] listing each mismatch.
    pub fn verify(
        &self,
        response: &ApiResponse,
        schemas: &SchemaCatalog,
    ) -> Result<(), ContractViolation> {
        let mut mismatches = Vec::new();
        if !self.status.matches(response.status) {
            mismatches.push(format!("status: expected {}, got {}", self.status, response.status));
            return Err(self.violation(response, mismatches));
        }

        if self.json {
            let is_json =
                response.content_type.as_deref().is_some_and(|value| value.contains(JSON_MEDIA_TYPE));
            if !is_json {
                mismatches.push(format!(
                    "content-type: expected {JSON_MEDIA_TYPE}, got {}",
                    response.content_type.as_deref().unwrap_or("<none>")
                ));
            }
        }

        if self.inspects_body() {
            match response.json() {
                Ok(body) => self.check_body(&body, schemas, &mut mismatches),
                Err(err) => mismatches.push(format!("body: not valid JSON ({err})")),
            }
        }

        if mismatches.is_empty() { Ok(()) } else { Err(self.violation(response, mismatches)) }
    }

    /// Applies shape, schema, and field checks to a decoded body.
    fn check_body(&self, body: &Value, schemas: &SchemaCatalog, mismatches: &mut Vec<String>) {
        match self.shape {
            BodyShape::Any => {}
            BodyShape::Object => {
                if !body.is_object() {
                    mismatches.push(format!("body: expected object, got {}", kind(body)));
                }
            }
            BodyShape::NonEmptyArray => match body.as_array() {
                Some(items) if !items.is_empty() => {}
                Some(_) => mismatches.push("body: expected non-empty array, got []".to_string()),
                None => mismatches.push(format!("body: expected array, got {}", kind(body))),
            },
        }

        if let Some(schema) = self.schema {
            mismatches.extend(
                schemas.validate(schema, body).into_iter().map(|err| format!("schema {schema}: {err}")),
            );
        }

        for check in &self.fields {
            match check {
                FieldCheck::Equals {
                    field,
                    expected,
                } => {
                    let actual = body.get(field).unwrap_or(&Value::Null);
                    if actual != expected {
                        mismatches.push(format!("field `{field}`: expected {expected}, got {actual}"));
                    }
                }
                FieldCheck::NotNull(field) => {
                    if body.get(field).is_none_or(Value::is_null) {
                        mismatches.push(format!("field `{field}`: expected non-null value"));
                    }
                }
                FieldCheck::PublishDate(field) => match body.get(field).and_then(Value::as_str) {
                    Some(raw) if parse_publish_date(raw).is_ok() => {}
                    Some(raw) => mismatches.push(format!(
                        "field `{field}`: expected YYYY-MM-DDTHH:MM:SS.mmmZ, got \"{raw}\""
                    )),
                    None => mismatches.push(format!("field `{field}`: expected date string")),
                },
            }
        }
    }

    /// Builds the violation for this bundle.
    fn violation(&self, response: &ApiResponse, mismatches: Vec<String>) -> ContractViolation {
        ContractViolation {
            expectation: self.name.clone(),
            status: response.status,
            mismatches,
        }
    }
}

/// Names the JSON kind of a value for mismatch messages.
const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A response that failed its expectation bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contract `{expectation}` violated (status {status}): {}", mismatches.join("; "))]
pub struct ContractViolation {
    /// Name of the failed bundle.
    pub expectation: String,
    /// Actual response status.
    pub status: u16,
    /// Each failed assertion with literal expected and actual values.
    pub mismatches: Vec<String>,
}

// ============================================================================
// SECTION: Payload Defects
// ============================================================================

/// Ways a create or update payload can be invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadDefect {
    /// Body is `{}`.
    EmptyObject,
    /// `id` omitted.
    MissingId,
    /// `title` omitted.
    MissingTitle,
    /// `title` is null.
    NullTitle,
    /// `id` is a string.
    NonNumericId,
    /// `pageCount` is a string.
    NonNumericPageCount,
    /// `pageCount` is negative.
    NegativePageCount,
    /// `publishDate` is not an ISO-8601 timestamp.
    InvalidDate,
    /// Body is not valid JSON.
    MalformedJson,
    /// Body id differs from the path id.
    IdMismatch,
}

impl PayloadDefect {
    /// Returns the statuses an API may answer with for this defect.
    #[must_use]
    pub const fn statuses(self) -> &'static [u16] {
        match self {
            Self::MalformedJson => MALFORMED_JSON_STATUSES,
            Self::IdMismatch => ID_MISMATCH_STATUSES,
            Self::EmptyObject
            | Self::MissingId
            | Self::MissingTitle
            | Self::NullTitle
            | Self::NonNumericId
            | Self::NonNumericPageCount
            | Self::NegativePageCount
            | Self::InvalidDate => INVALID_PAYLOAD_STATUSES,
        }
    }

    /// Returns a short label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyObject => "empty object",
            Self::MissingId => "missing id",
            Self::MissingTitle => "missing title",
            Self::NullTitle => "null title",
            Self::NonNumericId => "non-numeric id",
            Self::NonNumericPageCount => "non-numeric pageCount",
            Self::NegativePageCount => "negative pageCount",
            Self::InvalidDate => "invalid publishDate",
            Self::MalformedJson => "malformed JSON",
            Self::IdMismatch => "id mismatch",
        }
    }
}

impl fmt::Display for PayloadDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Oracle
// ============================================================================

/// Expected behavior of the Books resource, one bundle per outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConformanceOracle;

impl ConformanceOracle {
    /// `GET /Books`: 200, JSON, non-empty array matching the collection schema.
    #[must_use]
    pub fn read_collection() -> ExpectationBundle {
        ExpectationBundle::new("read collection", StatusExpectation::Exactly(200))
            .json()
            .shape(BodyShape::NonEmptyArray)
            .schema(SchemaRef::BookCollection)
    }

    /// `GET /Books/{id}` for an existing id: 200, matching id, no null fields.
    #[must_use]
    pub fn read_existing(id: i64) -> ExpectationBundle {
        let bundle = ExpectationBundle::new(format!("read book {id}"), StatusExpectation::Exactly(200))
            .json()
            .shape(BodyShape::Object)
            .schema(SchemaRef::Book)
            .field_equals("id", json!(id));
        REQUIRED_FIELDS
            .iter()
            .skip(1)
            .fold(bundle, |bundle, field| bundle.field_not_null(field))
            .field_publish_date("publishDate")
    }

    /// `GET /Books/{id}` after a write: every field equals `book`.
    #[must_use]
    pub fn read_echo(book: &Book) -> ExpectationBundle {
        echo(format!("read back book {}", book.id), book)
    }

    /// `GET /Books/{id}` for an absent id: 404.
    #[must_use]
    pub fn read_absent() -> ExpectationBundle {
        ExpectationBundle::new("read absent book", StatusExpectation::Exactly(404))
    }

    /// `GET /Books/{id}` for a malformed id: 400 or 404.
    #[must_use]
    pub fn read_malformed_id() -> ExpectationBundle {
        ExpectationBundle::new("read malformed id", StatusExpectation::AnyOf(MALFORMED_ID_STATUSES))
    }

    /// `POST /Books` with a valid body and unused id: 200 echoing `book`.
    #[must_use]
    pub fn create_echo(book: &Book) -> ExpectationBundle {
        echo(format!("create book {}", book.id), book)
    }

    /// `POST /Books` with an id already in use: 400, 409, or 422.
    #[must_use]
    pub fn create_duplicate() -> ExpectationBundle {
        ExpectationBundle::new("create duplicate id", StatusExpectation::AnyOf(CONFLICT_STATUSES))
    }

    /// `POST /Books` with a defective payload.
    #[must_use]
    pub fn create_rejected(defect: PayloadDefect) -> ExpectationBundle {
        ExpectationBundle::new(format!("create rejects {defect}"), StatusExpectation::AnyOf(defect.statuses()))
    }

    /// `PUT /Books/{id}` for an existing id: 200 echoing `book`.
    #[must_use]
    pub fn update_echo(book: &Book) -> ExpectationBundle {
        echo(format!("update book {}", book.id), book)
    }

    /// `PUT /Books/{id}` for an absent id: 404.
    #[must_use]
    pub fn update_absent() -> ExpectationBundle {
        ExpectationBundle::new("update absent book", StatusExpectation::Exactly(404))
    }

    /// `PUT /Books/{id}` with a defective payload.
    #[must_use]
    pub fn update_rejected(defect: PayloadDefect) -> ExpectationBundle {
        ExpectationBundle::new(format!("update rejects {defect}"), StatusExpectation::AnyOf(defect.statuses()))
    }

    /// `DELETE /Books/{id}` for an existing id: 200.
    #[must_use]
    pub fn delete_existing() -> ExpectationBundle {
        ExpectationBundle::new("delete book", StatusExpectation::Exactly(200))
    }

    /// `DELETE /Books/{id}` for an absent numeric id: 404.
    #[must_use]
    pub fn delete_absent() -> ExpectationBundle {
        ExpectationBundle::new("delete absent book", StatusExpectation::Exactly(404))
    }

    /// `DELETE /Books/{id}` for a malformed id: 400 or 404.
    #[must_use]
    pub fn delete_malformed_id() -> ExpectationBundle {
        ExpectationBundle::new("delete malformed id", StatusExpectation::AnyOf(MALFORMED_ID_STATUSES))
    }
}

/// 200 with a JSON object equal field-for-field to `book`.
fn echo(name: String, book: &Book) -> ExpectationBundle {
    ExpectationBundle::new(name, StatusExpectation::Exactly(200))
        .json()
        .shape(BodyShape::Object)
        .schema(SchemaRef::Book)
        .field_equals("id", json!(book.id))
        .field_equals("title", json!(book.title))
        .field_equals("description", json!(book.description))
        .field_equals("pageCount", json!(book.page_count))
        .field_equals("excerpt", json!(book.excerpt))
        .field_equals("publishDate", json!(book.publish_date))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
