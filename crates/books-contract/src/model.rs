// crates/books-contract/src/model.rs
// ============================================================================
// Module: Books Model
// Description: The Book resource exchanged with the API under test.
// Purpose: Typed payloads plus local domain checks for scenario fixtures.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! [`Book`] mirrors the wire shape (`id`, `title`, `description`,
//! `pageCount`, `excerpt`, `publishDate`). Identifiers are caller-supplied.
//! [`Book::validate`] checks the local domain rules used to keep positive
//! fixtures honest; the server remains the source of truth for persistence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire format for `publishDate`: ISO-8601 with milliseconds and a `Z` suffix.
const PUBLISH_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Local domain rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// Title is empty or whitespace.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Page count is negative.
    #[error("pageCount must be non-negative, got {0}")]
    NegativePageCount(i64),
    /// Publish date does not match `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    #[error("publishDate `{0}` is not ISO-8601 with milliseconds and a Z suffix")]
    InvalidPublishDate(String),
}

// ============================================================================
// SECTION: Book
// ============================================================================

/// A book resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Caller-supplied identifier.
    pub id: i64,
    /// Required title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Number of pages.
    pub page_count: i64,
    /// Short excerpt.
    pub excerpt: String,
    /// Publish timestamp in wire format.
    pub publish_date: String,
}

impl Book {
    /// Starts a builder for a book with the given identifier.
    #[must_use]
    pub fn builder(id: i64) -> BookBuilder {
        BookBuilder {
            book: Self {
                id,
                title: String::new(),
                description: String::new(),
                page_count: 0,
                excerpt: String::new(),
                publish_date: String::new(),
            },
        }
    }

    /// Returns the wire JSON object for this book.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "pageCount": self.page_count,
            "excerpt": self.excerpt,
            "publishDate": self.publish_date,
        })
    }

    /// Checks local domain rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`BookError`] found.
    pub fn validate(&self) -> Result<(), BookError> {
        if self.title.trim().is_empty() {
            return Err(BookError::EmptyTitle);
        }
        if self.page_count < 0 {
            return Err(BookError::NegativePageCount(self.page_count));
        }
        parse_publish_date(&self.publish_date)?;
        Ok(())
    }
}

/// Builder for [`Book`] fixtures.
#[derive(Debug, Clone)]
pub struct BookBuilder {
    /// Book under construction.
    book: Book,
}

impl BookBuilder {
    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.book.title = title.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.book.description = description.into();
        self
    }

    /// Sets the page count.
    #[must_use]
    pub const fn page_count(mut self, page_count: i64) -> Self {
        self.book.page_count = page_count;
        self
    }

    /// Sets the excerpt.
    #[must_use]
    pub fn excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.book.excerpt = excerpt.into();
        self
    }

    /// Sets the publish date (wire format).
    #[must_use]
    pub fn publish_date(mut self, publish_date: impl Into<String>) -> Self {
        self.book.publish_date = publish_date.into();
        self
    }

    /// Finishes the book.
    #[must_use]
    pub fn build(self) -> Book {
        self.book
    }
}

// ============================================================================
// SECTION: Publish Dates
// ============================================================================

/// Parses a wire-format publish date.
///
/// # Errors
///
/// Returns [`BookError::InvalidPublishDate`] when `raw` does not match the
/// wire format.
pub fn parse_publish_date(raw: &str) -> Result<OffsetDateTime, BookError> {
    PrimitiveDateTime::parse(raw, PUBLISH_DATE_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| BookError::InvalidPublishDate(raw.to_string()))
}

/// Formats a timestamp in wire format, converting to UTC first.
///
/// # Errors
///
/// Returns [`BookError::InvalidPublishDate`] when the timestamp cannot be
/// formatted (for example, a year outside four digits).
pub fn format_publish_date(at: OffsetDateTime) -> Result<String, BookError> {
    let utc = at.to_offset(UtcOffset::UTC);
    utc.format(PUBLISH_DATE_FORMAT).map_err(|err| BookError::InvalidPublishDate(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
