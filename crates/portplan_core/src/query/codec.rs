//! Query codec: applied filters to query strings and readable descriptions.
//!
//! # Responsibility
//! - Render applied filters as `key=value` pairs plus a readable sentence.
//! - Parse a query string back into ordered raw values per key.
//!
//! # Invariants
//! - Reference IDs are emitted in ascending order, the null flag (`key=`)
//!   last.
//! - Text filters always carry their `<key>Logic` companion.
//! - Decoding keeps first-appearance key order and every repeated value.

use crate::model::attribute::{AttributeKind, ResolvedAttribute, Selection, TextLogic};
use serde::Serialize;

/// Suffix of the companion key carrying a text filter's logic mode.
pub const LOGIC_SUFFIX: &str = "Logic";
/// Description of an empty filter set.
pub const NO_FILTER_DESCRIPTION: &str = "none";
const CLAUSE_SEPARATOR: &str = ", and ";

/// Encoded form of an applied filter set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedQuery {
    pub query_string: String,
    pub description: String,
}

/// Companion key of text attribute `key`.
pub fn logic_key(key: &str) -> String {
    format!("{key}{LOGIC_SUFFIX}")
}

/// Encodes filters in order.
pub fn encode<'a, I>(filters: I) -> EncodedQuery
where
    I: IntoIterator<Item = (&'a ResolvedAttribute, &'a Selection)>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut clauses = Vec::new();

    for (attr, selection) in filters {
        for (key, value) in pairs(attr, selection) {
            serializer.append_pair(&key, &value);
        }
        if let Some(clause) = describe(attr, selection) {
            clauses.push(clause);
        }
    }

    let description = if clauses.is_empty() {
        NO_FILTER_DESCRIPTION.to_string()
    } else {
        clauses.join(CLAUSE_SEPARATOR)
    };
    EncodedQuery {
        query_string: serializer.finish(),
        description,
    }
}

/// Parses a query string into `(key, values)` in first-appearance order.
pub fn decode(query: &str) -> Vec<(String, Vec<String>)> {
    let query = query.trim().trim_start_matches('?');
    let mut decoded: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        match decoded.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => decoded.push((key.into_owned(), vec![value.into_owned()])),
        }
    }
    decoded
}

fn pairs(attr: &ResolvedAttribute, selection: &Selection) -> Vec<(String, String)> {
    match selection {
        Selection::Text { search, logic } => {
            let search = search.trim();
            let mut pairs = match logic {
                TextLogic::Phrase => vec![(attr.key.clone(), search.to_string())],
                TextLogic::And | TextLogic::Or => search
                    .split_whitespace()
                    .map(|word| (attr.key.clone(), word.to_string()))
                    .collect(),
            };
            pairs.push((logic_key(&attr.key), logic.as_str().to_string()));
            pairs
        }
        Selection::Value(value) => vec![(attr.key.clone(), value.clone())],
        Selection::Choices { ids, include_null } => {
            let mut ids = ids.clone();
            ids.sort_unstable();
            ids.dedup();
            let mut pairs = ids
                .into_iter()
                .map(|id| (attr.key.clone(), id.to_string()))
                .collect::<Vec<_>>();
            if *include_null {
                pairs.push((attr.key.clone(), String::new()));
            }
            pairs
        }
    }
}

fn describe(attr: &ResolvedAttribute, selection: &Selection) -> Option<String> {
    let label = attr.label.as_str();
    match selection {
        Selection::Text { search, logic } => {
            let search = search.trim();
            if search.is_empty() {
                return None;
            }
            let quoted = match logic {
                TextLogic::Phrase => format!("'{search}'"),
                TextLogic::And | TextLogic::Or => search
                    .split_whitespace()
                    .map(|word| format!("'{word}'"))
                    .collect::<Vec<_>>()
                    .join(if *logic == TextLogic::And { " and " } else { " or " }),
            };
            Some(format!("{label} contains {quoted}"))
        }
        Selection::Value(value) => Some(format!("{label}={value}")),
        Selection::Choices { ids, include_null } => {
            let mut ids = ids.clone();
            ids.sort_unstable();
            ids.dedup();
            let names = ids
                .iter()
                .filter_map(|id| attr.choice(*id))
                .map(|entry| format!("'{}'", entry.display()))
                .collect::<Vec<_>>();

            let mut parts = Vec::new();
            if !names.is_empty() {
                let operator = if attr.kind == AttributeKind::MultiReference {
                    " include "
                } else {
                    "="
                };
                parts.push(format!("{label}{operator}{}", names.join(" or ")));
            }
            if *include_null {
                parts.push(format!("no {label}"));
            }
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" or "))
            }
        }
    }
}
