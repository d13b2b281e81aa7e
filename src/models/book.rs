//! Book model and catalog queries

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Hyphenated ISBN: groups of digits, optional X check character
static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,5}(-\d{1,7}){2,3}-[\dX]$").expect("valid ISBN regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    ScienceFiction,
    Fantasy,
    Novel,
    Tale,
    Thriller,
    Other,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub year: Option<i32>,
    pub genre: Option<Genre>,
}

/// Short book representation for lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        BookSummary {
            id: book.id,
            title: book.title.clone(),
        }
    }
}

/// Either listing shape, depending on the requested format
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum BookListing {
    Simple(BookSummary),
    Detailed(Book),
}

/// Create / replace request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_book_input"))]
pub struct BookInput {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub isbn: String,
    pub year: Option<i32>,
    pub genre: Option<Genre>,
}

impl BookInput {
    pub fn into_book(self, id: i32) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            year: self.year,
            genre: self.genre,
        }
    }
}

fn validate_book_input(input: &BookInput) -> Result<(), ValidationError> {
    if !is_valid_isbn(&input.isbn) {
        let mut error = ValidationError::new("isbn");
        error.message = Some("Invalid ISBN".into());
        return Err(error);
    }
    if let Some(year) = input.year {
        if year <= 1900 || year > Utc::now().year() {
            let mut error = ValidationError::new("year");
            error.message = Some("Year must be after 1900 and not in the future".into());
            return Err(error);
        }
    }
    Ok(())
}

/// Hyphenated ISBN-13 (13 digits) or ISBN-10 (10 characters, X allowed last)
pub fn is_valid_isbn(isbn: &str) -> bool {
    if !ISBN_RE.is_match(isbn) {
        return false;
    }
    let compact: String = isbn.chars().filter(|c| *c != '-').collect();
    match compact.len() {
        13 => compact.chars().all(|c| c.is_ascii_digit()),
        10 => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    #[default]
    Simple,
    Detailed,
}

/// Book listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    #[serde(default)]
    pub format: ListFormat,
}

/// Book search query parameters
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookSearchQuery {
    /// Case-insensitive fragment of the title
    #[validate(length(min = 1, message = "Search term must not be empty"))]
    pub q: String,
}
