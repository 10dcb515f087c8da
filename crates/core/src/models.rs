//! Catalog entities and their stored representation.

use std::{fmt, str::FromStr};

use catalog_db::{Document, RecordId, StoreError};
use chrono::{Datelike, NaiveDate};
use serde::{de::DeserializeOwned, ser::Error as _, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub const AUTHORS: &str = "authors";
pub const GENRES: &str = "genres";
pub const BOOKS: &str = "books";
pub const BOOK_INSTANCES: &str = "bookinstances";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Author,
    Genre,
    Book,
    BookInstance,
}

impl EntityKind {
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Author => AUTHORS,
            Self::Genre => GENRES,
            Self::Book => BOOKS,
            Self::BookInstance => BOOK_INSTANCES,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Author => "author",
            Self::Genre => "genre",
            Self::Book => "book",
            Self::BookInstance => "book instance",
        }
    }

    pub fn url(self, id: &RecordId) -> String {
        let segment = match self {
            Self::Author => "author",
            Self::Genre => "genre",
            Self::Book => "book",
            Self::BookInstance => "bookinstance",
        };
        format!("/catalog/{segment}/{id}")
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value stored in one of the catalog collections.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Computed fields added when the record is presented, never stored.
    fn derived(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }
}

/// An entity identified by a set of fields rather than by its record id.
pub trait Keyed: Entity {
    /// Fields whose combined value must be unique across the collection.
    const KEY_FIELDS: &'static [&'static str];
}

/// A stored entity together with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub id: RecordId,
    pub value: T,
}

impl<T: Entity> Record<T> {
    pub fn from_document(doc: Document) -> Result<Self, StoreError> {
        let value = serde_json::from_value(doc.body)?;
        Ok(Self { id: doc.id, value })
    }

    pub fn url(&self) -> String {
        T::KIND.url(&self.id)
    }
}

impl<T: Entity> Serialize for Record<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut body = match serde_json::to_value(&self.value).map_err(S::Error::custom)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("id".to_string(), Value::from(&self.id));
        for (field, value) in self.value.derived() {
            body.insert(field.to_string(), value);
        }
        body.insert("url".to_string(), Value::String(self.url()));
        body.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// "First Last", or empty when either part is missing.
    pub fn name(&self) -> String {
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return String::new();
        }
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn lifespan(&self) -> String {
        match (self.date_of_birth, self.date_of_death) {
            (Some(born), Some(died)) => (died.year() - born.year()).to_string(),
            (Some(born), None) => format!("Born on {}", born.year()),
            _ => "No Details found".to_string(),
        }
    }
}

impl Entity for Author {
    const KIND: EntityKind = EntityKind::Author;

    fn derived(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::String(self.name())),
            ("lifespan", Value::String(self.lifespan())),
            ("date_of_birth_formatted", Value::String(format_date(self.date_of_birth))),
            ("date_of_death_formatted", Value::String(format_date(self.date_of_death))),
        ]
    }
}

impl Keyed for Author {
    const KEY_FIELDS: &'static [&'static str] =
        &["first_name", "last_name", "date_of_birth", "date_of_death"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
}

impl Entity for Genre {
    const KIND: EntityKind = EntityKind::Genre;
}

impl Keyed for Genre {
    const KEY_FIELDS: &'static [&'static str] = &["name"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: RecordId,
    pub summary: String,
    pub isbn: String,
    #[serde(default)]
    pub genre: Vec<RecordId>,
}

impl Entity for Book {
    const KIND: EntityKind = EntityKind::Book;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Available,
        Status::Maintenance,
        Status::Loaned,
        Status::Reserved,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Maintenance => "Maintenance",
            Self::Loaned => "Loaned",
            Self::Reserved => "Reserved",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| format!("unknown status `{raw}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInstance {
    pub book: RecordId,
    pub imprint: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub due_back: Option<NaiveDate>,
}

impl Entity for BookInstance {
    const KIND: EntityKind = EntityKind::BookInstance;

    fn derived(&self) -> Vec<(&'static str, Value)> {
        vec![("due_back_formatted", Value::String(format_date(self.due_back)))]
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
