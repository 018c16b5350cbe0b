//! Report projector: one display row per project.
//!
//! # Responsibility
//! - Format raw attribute values for display.
//! - Describe the report columns and table options for the client.
//!
//! # Invariants
//! - Every row carries `projectID`.
//! - Rows follow the order of the given project IDs.

use crate::model::attribute::{AttributeKind, AttributeSource, ResolvedAttribute};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoResult;
use crate::schema::catalog::ColumnType;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

const ELLIPSIS: &str = "...";
const DATE_FORMAT: &str = "%m/%d/%Y";
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
const STORED_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];
const VALUE_SEPARATOR: &str = ", ";
const PROJECT_ID_KEY: &str = "projectID";

/// Display limits applied while projecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectorSettings {
    pub page_length: usize,
    pub truncate_at: usize,
}

impl Default for ProjectorSettings {
    fn default() -> Self {
        Self {
            page_length: 25,
            truncate_at: 100,
        }
    }
}

/// Display metadata of one report column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMeta {
    pub data: String,
    pub title: String,
}

/// Table rendering hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOptions {
    pub page_length: usize,
    /// Pagination is shown only when rows exceed one page.
    pub paging: bool,
    pub paging_type: &'static str,
    pub length_change: bool,
    pub searching: bool,
}

impl TableOptions {
    pub fn for_rows(rows: usize, page_length: usize) -> Self {
        Self {
            page_length,
            paging: rows > page_length,
            paging_type: "full_numbers",
            length_change: false,
            searching: false,
        }
    }
}

/// Projected report table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub data: Vec<Map<String, JsonValue>>,
    pub columns: Vec<ColumnMeta>,
    pub options: TableOptions,
}

/// Projects `attrs` for every project in `project_ids`.
pub fn project<R: ProjectRepository>(
    repo: &R,
    attrs: &[ResolvedAttribute],
    project_ids: &[i64],
    settings: ProjectorSettings,
) -> RepoResult<Projection> {
    let mut data = project_ids
        .iter()
        .map(|id| {
            let mut row = Map::new();
            row.insert(PROJECT_ID_KEY.to_string(), JsonValue::from(*id));
            row
        })
        .collect::<Vec<_>>();

    for attr in attrs {
        let values = repo.attribute_values(attr)?;
        for (row, id) in data.iter_mut().zip(project_ids) {
            let stored = values.get(id).map(Vec::as_slice).unwrap_or_default();
            row.insert(attr.key.clone(), display_value(attr, stored, settings));
        }
    }

    let columns = attrs
        .iter()
        .map(|attr| ColumnMeta {
            data: attr.key.clone(),
            title: capitalize(&attr.label),
        })
        .collect();
    let options = TableOptions::for_rows(data.len(), settings.page_length);
    Ok(Projection {
        data,
        columns,
        options,
    })
}

fn display_value(
    attr: &ResolvedAttribute,
    stored: &[Value],
    settings: ProjectorSettings,
) -> JsonValue {
    match attr.kind {
        AttributeKind::SingleReference => match stored.iter().find_map(as_id) {
            Some(id) => attr
                .choice(id)
                .map_or(JsonValue::Null, |entry| entry.description.clone().into()),
            None => attr
                .choice(0)
                .map_or_else(String::new, |entry| entry.description.clone())
                .into(),
        },
        AttributeKind::MultiReference => stored
            .iter()
            .filter_map(as_id)
            .filter_map(|id| attr.choice(id))
            .map(|entry| entry.description.as_str())
            .collect::<Vec<_>>()
            .join(VALUE_SEPARATOR)
            .into(),
        AttributeKind::Scalar => {
            let ty = match &attr.source {
                AttributeSource::Column { ty, .. } => *ty,
                _ => ColumnType::Text,
            };
            let mut shown = stored
                .iter()
                .map(|value| scalar_value(value, ty, settings.truncate_at))
                .filter(|value| !value.is_null())
                .collect::<Vec<_>>();
            match shown.len() {
                0 => JsonValue::Null,
                1 => shown.remove(0),
                _ => shown
                    .iter()
                    .map(|value| match value {
                        JsonValue::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(VALUE_SEPARATOR)
                    .into(),
            }
        }
    }
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(id) => Some(*id),
        Value::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_value(value: &Value, ty: ColumnType, truncate_at: usize) -> JsonValue {
    match value {
        Value::Null | Value::Blob(_) => JsonValue::Null,
        Value::Integer(number) => JsonValue::from(*number),
        Value::Real(number) => JsonValue::from(*number),
        Value::Text(text) => match ty {
            ColumnType::Date => format_date(text).into(),
            ColumnType::Timestamp => format_timestamp(text).into(),
            ColumnType::String | ColumnType::Text => truncate_text(text, truncate_at).into(),
            ColumnType::Integer | ColumnType::Float => text.clone().into(),
        },
    }
}

/// Renders a stored `YYYY-MM-DD` date as `MM/DD/YYYY`; other text is kept.
pub fn format_date(stored: &str) -> String {
    let stored = stored.trim();
    stored
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map_or_else(|| stored.to_string(), |date| date.format(DATE_FORMAT).to_string())
}

/// Renders a stored timestamp as `MM/DD/YYYY HH:MM:SS`.
pub fn format_timestamp(stored: &str) -> String {
    let stored = stored.trim();
    STORED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(stored, format).ok())
        .map_or_else(
            || format_date(stored),
            |timestamp| timestamp.format(TIMESTAMP_FORMAT).to_string(),
        )
}

/// Truncates text longer than `max_chars` at the last space within the
/// first `max_chars` characters and appends an ellipsis.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head = text
        .char_indices()
        .nth(max_chars)
        .map_or(text, |(index, _)| &text[..index]);
    let cut = head.rfind(' ').map_or(head, |index| &head[..index]);
    format!("{cut}{ELLIPSIS}")
}

/// Uppercases the first character and lowercases the rest.
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
