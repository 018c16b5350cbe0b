//! Applied filter sets built from decoded query strings.
//!
//! # Responsibility
//! - Resolve query keys and turn raw values into typed selections.
//! - Degrade gracefully: unknown keys and unusable values are skipped.
//!
//! # Invariants
//! - Filters keep the order in which their keys first appeared.
//! - A filter whose selection ends up empty is never applied.
//! - Ambiguous keys are configuration errors and abort the whole set.

use super::codec::{self, EncodedQuery, LOGIC_SUFFIX};
use super::plan::ProjectQuery;
use super::predicate::{build_filter, typed_value};
use super::QueryError;
use crate::model::attribute::{
    AttributeKind, AttributeSource, ResolvedAttribute, Selection, TextLogic,
};
use crate::resolve::resolver::{AttributeResolver, ResolveError, ResolveResult};
use crate::schema::catalog::SchemaCatalog;
use log::{debug, warn};
use rusqlite::Connection;

/// One attribute with the values selected for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFilter {
    pub attribute: ResolvedAttribute,
    pub selection: Selection,
}

/// Ordered filters combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<AppliedFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the filter set for decoded query pairs.
    ///
    /// # Errors
    /// - Returns `AmbiguousAttribute` and store failures from resolution.
    pub fn from_query(
        resolver: &AttributeResolver,
        conn: &Connection,
        decoded: &[(String, Vec<String>)],
    ) -> ResolveResult<Self> {
        let mut set = Self::new();
        for (key, values) in decoded {
            if is_logic_companion(key, decoded) {
                continue;
            }

            let attribute = match resolver.resolve(conn, key) {
                Ok(attribute) => attribute,
                Err(ResolveError::UnknownAttribute(_)) => {
                    warn!("event=filter_skip module=query status=skip key={key} reason=unknown_attribute");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let logic = lookup(decoded, &codec::logic_key(key))
                .and_then(|values| values.first())
                .map(String::as_str);
            match selection_from_values(&attribute, values, logic) {
                Some(selection) => set.push(attribute, selection),
                None => {
                    debug!("event=filter_skip module=query status=skip key={key} reason=empty_selection");
                }
            }
        }
        Ok(set)
    }

    /// Appends a filter unless its selection is empty.
    pub fn push(&mut self, attribute: ResolvedAttribute, selection: Selection) {
        if selection.is_empty() {
            return;
        }
        self.filters.push(AppliedFilter {
            attribute,
            selection,
        });
    }

    pub fn filters(&self) -> &[AppliedFilter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn encode(&self) -> EncodedQuery {
        codec::encode(
            self.filters
                .iter()
                .map(|filter| (&filter.attribute, &filter.selection)),
        )
    }

    /// Project query applying every filter.
    pub fn to_query(&self, catalog: &SchemaCatalog) -> Result<ProjectQuery, QueryError> {
        let mut query = ProjectQuery::new(catalog);
        for filter in &self.filters {
            if let Some(predicate) = build_filter(catalog, &filter.attribute, &filter.selection) {
                query.filter(predicate)?;
            }
        }
        Ok(query)
    }
}

/// Turns raw query values into a selection for `attribute`.
///
/// Text values are joined with a space; reference values keep known numeric
/// IDs and treat an empty value as the null flag.
pub fn selection_from_values(
    attribute: &ResolvedAttribute,
    values: &[String],
    logic: Option<&str>,
) -> Option<Selection> {
    let selection = match attribute.kind {
        AttributeKind::Scalar if attribute.is_text() => {
            let search = values
                .iter()
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            let logic = logic.and_then(TextLogic::parse).unwrap_or_default();
            Selection::text(search, logic)
        }
        AttributeKind::Scalar => {
            let value = values.iter().map(|value| value.trim()).find(|value| !value.is_empty())?;
            let parses = match &attribute.source {
                AttributeSource::Column { ty, .. } => typed_value(*ty, value).is_some(),
                _ => false,
            };
            if !parses {
                debug!(
                    "event=filter_skip module=query status=skip key={} reason=invalid_selection",
                    attribute.key
                );
                return None;
            }
            Selection::Value(value.to_string())
        }
        AttributeKind::SingleReference | AttributeKind::MultiReference => {
            let mut ids = Vec::new();
            let mut include_null = false;
            for value in values {
                let value = value.trim();
                if value.is_empty() {
                    include_null = true;
                    continue;
                }
                match value.parse::<i64>() {
                    Ok(id) if attribute.choice(id).is_some() => ids.push(id),
                    _ => debug!(
                        "event=filter_skip module=query status=skip key={} reason=invalid_selection",
                        attribute.key
                    ),
                }
            }
            ids.sort_unstable();
            ids.dedup();
            Selection::Choices { ids, include_null }
        }
    };
    (!selection.is_empty()).then_some(selection)
}

fn lookup<'a>(decoded: &'a [(String, Vec<String>)], key: &str) -> Option<&'a Vec<String>> {
    decoded
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, values)| values)
}

fn is_logic_companion(key: &str, decoded: &[(String, Vec<String>)]) -> bool {
    key.strip_suffix(LOGIC_SUFFIX)
        .is_some_and(|base| !base.is_empty() && lookup(decoded, base).is_some())
}
