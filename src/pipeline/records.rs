//! Flattening, column normalization and the raw film table.

use serde::Serialize;
use serde_json::{Map, Value};

/// One flat row keyed by column name.
pub type Row = Map<String, Value>;

/// Columns of the raw table, in output order.
pub const FINAL_COLUMNS: [&str; 6] = ["film", "year", "wiki_url", "winner", "detail_url", "budget"];

/// Flattens nested objects into dotted keys (`{"a": {"b": 1}}` -> `a.b`).
///
/// Anything that is not an object flattens to an empty row.
#[must_use]
pub fn flatten_object(value: &Value) -> Row {
    let mut row = Row::new();
    if let Value::Object(map) = value {
        flatten_into(&mut row, None, map);
    }
    row
}

fn flatten_into(row: &mut Row, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(row, Some(&name), inner),
            _ => {
                row.insert(name, value.clone());
            }
        }
    }
}

/// `" Detail URL "` -> `"detail_url"`.
#[must_use]
pub fn normalize_column(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

/// Joins each film row with its detail record under normalized column names.
///
/// Rows and details pair up by position. Film row fields win when both sides
/// normalize to the same column.
#[must_use]
pub fn merge_details(rows: Vec<Row>, details: Vec<Value>) -> Vec<Row> {
    rows.into_iter()
        .zip(details.into_iter().chain(std::iter::repeat(Value::Null)))
        .map(|(row, detail)| {
            let mut merged = Row::new();
            for (key, value) in row.into_iter().chain(flatten_object(&detail)) {
                merged.entry(normalize_column(&key)).or_insert(value);
            }
            merged
        })
        .collect()
}

/// One row of the raw films table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilmRecord {
    /// Film title.
    pub film: Option<String>,
    /// Ceremony year label as published.
    pub year: Option<String>,
    /// Wikipedia link.
    pub wiki_url: Option<String>,
    /// Whether the film won.
    pub winner: Option<bool>,
    /// Detail page URL.
    pub detail_url: Option<String>,
    /// Budget text as published.
    pub budget: Option<String>,
}

impl FilmRecord {
    /// Picks the final columns out of a merged row.
    #[must_use]
    pub fn from_row(row: &Row) -> Self {
        let text = |column: &str| row.get(column).and_then(cell_text);
        Self {
            film: text("film"),
            year: text("year"),
            wiki_url: text("wiki_url"),
            winner: row.get("winner").and_then(cell_bool),
            detail_url: text("detail_url"),
            budget: text("budget"),
        }
    }

    /// Cells in [`FINAL_COLUMNS`] order; missing values are empty.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.film.clone().unwrap_or_default(),
            self.year.clone().unwrap_or_default(),
            self.wiki_url.clone().unwrap_or_default(),
            self.winner.map(bool_text).unwrap_or_default(),
            self.detail_url.clone().unwrap_or_default(),
            self.budget.clone().unwrap_or_default(),
        ]
    }
}

/// Text form of a JSON cell; `None` for null.
#[must_use]
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(bool_text(*b)),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn cell_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn bool_text(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}
