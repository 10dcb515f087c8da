//! Filter and sort vocabulary understood by every store backend.

use std::cmp::Ordering;

use serde_json::Value;

/// Conjunction of field equality conditions.
///
/// Equality follows document-store semantics: when the stored field is an
/// array and the expected value is not, the condition holds if the array
/// contains the value. A missing field equals `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| field_matches(body.get(field), expected))
    }
}

fn field_matches(stored: Option<&Value>, expected: &Value) -> bool {
    match stored {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
        None => expected.is_null(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Single-field ordering applied to a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

// null < bool < number < string < everything else
fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(_) => 4,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&json!({"name": "Fiction"})));
    }

    #[test]
    fn equality_on_scalar_fields() {
        let filter = Filter::eq("first_name", "Jane").and_eq("last_name", "Austen");
        assert!(filter.matches(&json!({"first_name": "Jane", "last_name": "Austen"})));
        assert!(!filter.matches(&json!({"first_name": "Jane", "last_name": "Eyre"})));
    }

    #[test]
    fn array_fields_match_by_membership() {
        let filter = Filter::eq("genre", "g-1");
        assert!(filter.matches(&json!({"genre": ["g-0", "g-1"]})));
        assert!(!filter.matches(&json!({"genre": []})));
    }

    #[test]
    fn missing_field_equals_null() {
        let filter = Filter::eq("date_of_birth", Value::Null);
        assert!(filter.matches(&json!({"first_name": "Jane"})));
        assert!(filter.matches(&json!({"date_of_birth": null})));
        assert!(!filter.matches(&json!({"date_of_birth": "1775-12-16"})));
    }

    #[test]
    fn sort_orders_strings_and_puts_nulls_first() {
        let mut docs = vec![
            json!({"last_name": "Tolkien"}),
            json!({}),
            json!({"last_name": "Austen"}),
        ];
        let sort = Sort::asc("last_name");
        docs.sort_by(|a, b| sort.compare(a, b));
        assert_eq!(docs[0], json!({}));
        assert_eq!(docs[1]["last_name"], "Austen");

        let sort = Sort::desc("last_name");
        docs.sort_by(|a, b| sort.compare(a, b));
        assert_eq!(docs[0]["last_name"], "Tolkien");
    }
}
