//! Field validation and sanitization of raw submitted input.
//!
//! Each form type turns raw strings into a normalized entity plus a list of
//! field errors. The engine never writes when that list is non-empty.

use std::str::FromStr;

use catalog_db::RecordId;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{CatalogError, FieldError};
use crate::models::{Author, Book, BookInstance, Entity, Genre, Status};

/// Normalized value plus every rule it broke.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub value: T,
    pub errors: Vec<FieldError>,
}

impl<T: Entity> Validated<T> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<T, CatalogError> {
        if self.errors.is_empty() {
            return Ok(self.value);
        }
        Err(CatalogError::Validation {
            kind: T::KIND,
            draft: serde_json::to_value(&self.value).unwrap_or_default(),
            errors: self.errors,
        })
    }
}

/// Raw input that knows how to check and normalize itself.
pub trait Validate {
    type Output: Entity;

    fn validate(&self) -> Validated<Self::Output>;
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Trimmed value; records `message` when empty.
    fn required(&mut self, field: &'static str, raw: Option<&str>, message: &str) -> String {
        let value = raw.map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            self.fail(field, message);
        }
        value
    }

    fn length(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len == 0 {
            return;
        }
        if len < min {
            self.fail(field, format!("Minimum length is {min}"));
        } else if len > max {
            self.fail(field, format!("Maximum length is {max}"));
        }
    }

    fn alphanumeric(&mut self, field: &'static str, value: &str, message: &str) {
        if !value.is_empty() && !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.fail(field, message);
        }
    }

    /// Optional ISO-8601 date; blank input is absent.
    fn date(&mut self, field: &'static str, raw: Option<&str>, message: &str) -> Option<NaiveDate> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        let parsed = parse_date(raw);
        if parsed.is_none() {
            self.fail(field, message);
        }
        parsed
    }

    fn finish<T>(self, value: T) -> Validated<T> {
        Validated {
            value,
            errors: self.errors,
        }
    }
}

/// Calendar dates in the ISO-8601 extended forms: a full date, a date-time
/// with or without an offset, or a reduced `YYYY-MM` / `YYYY`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    const LOCAL_DATE_TIMES: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            LOCAL_DATE_TIMES
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| parse_reduced_date(raw))
}

fn parse_reduced_date(raw: &str) -> Option<NaiveDate> {
    fn digits<T: FromStr>(part: &str, len: usize) -> Option<T> {
        if part.len() != len || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse().ok()
    }

    match raw.split_once('-') {
        None => NaiveDate::from_ymd_opt(digits(raw, 4)?, 1, 1),
        Some((year, month)) => NaiveDate::from_ymd_opt(digits(year, 4)?, digits(month, 2)?, 1),
    }
}

/// HTML-escape user text before it is stored.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorForm {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub date_of_death: Option<String>,
}

impl Validate for AuthorForm {
    type Output = Author;

    fn validate(&self) -> Validated<Author> {
        let mut check = Checker::default();

        let first_name = check.required(
            "first_name",
            self.first_name.as_deref(),
            "First name must be specified.",
        );
        check.alphanumeric(
            "first_name",
            &first_name,
            "First name has non-alphanumeric characters.",
        );
        check.length("first_name", &first_name, 1, 100);

        let last_name = check.required(
            "last_name",
            self.last_name.as_deref(),
            "Last name must be specified.",
        );
        check.alphanumeric(
            "last_name",
            &last_name,
            "Last name has non-alphanumeric characters.",
        );
        check.length("last_name", &last_name, 1, 100);

        let date_of_birth = check.date(
            "date_of_birth",
            self.date_of_birth.as_deref(),
            "Invalid date of birth",
        );
        let date_of_death = check.date(
            "date_of_death",
            self.date_of_death.as_deref(),
            "Invalid date of death",
        );

        check.finish(Author {
            first_name: escape(&first_name),
            last_name: escape(&last_name),
            date_of_birth,
            date_of_death,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenreForm {
    #[serde(default)]
    pub name: Option<String>,
}

impl Validate for GenreForm {
    type Output = Genre;

    fn validate(&self) -> Validated<Genre> {
        let mut check = Checker::default();
        let name = escape(&check.required("name", self.name.as_deref(), "Genre name required"));
        // Bounds apply to the stored, escaped text.
        check.length("name", &name, 3, 100);
        check.finish(Genre { name })
    }
}

/// A form field that may arrive as a single value or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre: OneOrMany,
}

impl Validate for BookForm {
    type Output = Book;

    fn validate(&self) -> Validated<Book> {
        let mut check = Checker::default();
        let title = check.required("title", self.title.as_deref(), "Title must not be empty.");
        let author = check.required(
            "author",
            self.author.as_deref(),
            "Author must not be empty.",
        );
        let summary = check.required(
            "summary",
            self.summary.as_deref(),
            "Summary must not be empty.",
        );
        let isbn = check.required("isbn", self.isbn.as_deref(), "ISBN must not be empty");

        let mut genre: Vec<RecordId> = Vec::new();
        for raw in self.genre.clone().into_vec() {
            let id = RecordId::new(raw.trim());
            if !id.as_str().is_empty() && !genre.contains(&id) {
                genre.push(id);
            }
        }

        check.finish(Book {
            title: escape(&title),
            author: RecordId::new(author),
            summary: escape(&summary),
            isbn: escape(&isbn),
            genre,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookInstanceForm {
    #[serde(default)]
    pub book: Option<String>,
    #[serde(default)]
    pub imprint: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_back: Option<String>,
}

impl Validate for BookInstanceForm {
    type Output = BookInstance;

    fn validate(&self) -> Validated<BookInstance> {
        let mut check = Checker::default();
        let book = check.required("book", self.book.as_deref(), "Book must be specified");
        let imprint = check.required(
            "imprint",
            self.imprint.as_deref(),
            "Imprint must be specified",
        );

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => Status::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                check.fail("status", "Invalid status");
                Status::default()
            }),
        };

        let due_back = check.date("due_back", self.due_back.as_deref(), "Invalid date");
        let malformed = check.errors.iter().any(|e| e.field == "due_back");
        if status != Status::Available && due_back.is_none() && !malformed {
            check.fail(
                "due_back",
                "Due back date must be specified unless the copy is available",
            );
        }

        check.finish(BookInstance {
            book: RecordId::new(book),
            imprint: escape(&imprint),
            status,
            due_back,
        })
    }
}
