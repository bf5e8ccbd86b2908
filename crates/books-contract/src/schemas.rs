// crates/books-contract/src/schemas.rs
// ============================================================================
// Module: Books Schemas
// Description: JSON schemas for Book payloads and collections.
// Purpose: Canonical structural contracts for successful reads and writes.
// Dependencies: jsonschema, serde_json
// ============================================================================

//! ## Overview
//! Schemas are strict: every field is required, types are exact, and unknown
//! properties are rejected. [`SchemaCatalog`] compiles them once per suite.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Schema References
// ============================================================================

/// Named schema used by an expectation bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaRef {
    /// A single book object.
    Book,
    /// A JSON array of book objects.
    BookCollection,
}

impl SchemaRef {
    /// Returns the schema identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Book => "books-contract://schemas/book.schema.json",
            Self::BookCollection => "books-contract://schemas/books-array.schema.json",
        }
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Schemas
// ============================================================================

/// Returns the JSON schema for a single book.
#[must_use]
pub fn book_schema() -> Value {
    let mut schema = book_item_schema();
    if let Some(object) = schema.as_object_mut() {
        object.insert("$schema".to_string(), json!("https://json-schema.org/draft/2020-12/schema"));
        object.insert("$id".to_string(), json!(SchemaRef::Book.as_str()));
        object.insert("title".to_string(), json!("Book"));
    }
    schema
}

/// Returns the JSON schema for a collection of books.
#[must_use]
pub fn book_collection_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": SchemaRef::BookCollection.as_str(),
        "title": "Book collection",
        "type": "array",
        "items": book_item_schema()
    })
}

/// Wire shape of `publishDate`: `YYYY-MM-DDTHH:MM:SS.mmmZ`.
const PUBLISH_DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$";

/// Shared object schema for a book.
fn book_item_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "title", "description", "pageCount", "excerpt", "publishDate"],
        "properties": {
            "id": { "type": "integer" },
            "title": { "type": "string" },
            "description": { "type": "string" },
            "pageCount": { "type": "integer" },
            "excerpt": { "type": "string" },
            "publishDate": { "type": "string", "pattern": PUBLISH_DATE_PATTERN }
        },
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Schema compilation failure.
#[derive(Debug, Error)]
#[error("invalid schema {schema}: {message}")]
pub struct SchemaError {
    /// Schema that failed to compile.
    pub schema: SchemaRef,
    /// Compiler message.
    pub message: String,
}

/// Compiled validators for every [`SchemaRef`].
pub struct SchemaCatalog {
    /// Single-book validator.
    book: Validator,
    /// Collection validator.
    collection: Validator,
}

impl fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCatalog").finish_non_exhaustive()
    }
}

impl SchemaCatalog {
    /// Compiles every bundled schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a schema fails to compile.
    pub fn compile() -> Result<Self, SchemaError> {
        Ok(Self {
            book: compile_schema(SchemaRef::Book, &book_schema())?,
            collection: compile_schema(SchemaRef::BookCollection, &book_collection_schema())?,
        })
    }

    /// Validates `instance`, returning one message per violation.
    #[must_use]
    pub fn validate(&self, schema: SchemaRef, instance: &Value) -> Vec<String> {
        let validator = match schema {
            SchemaRef::Book => &self.book,
            SchemaRef::BookCollection => &self.collection,
        };
        validator.iter_errors(instance).map(|err| err.to_string()).collect()
    }
}

/// Compiles a draft 2020-12 schema.
fn compile_schema(name: SchemaRef, schema: &Value) -> Result<Validator, SchemaError> {
    jsonschema::options().with_draft(Draft::Draft202012).build(schema).map_err(|err| SchemaError {
        schema: name,
        message: err.to_string(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
