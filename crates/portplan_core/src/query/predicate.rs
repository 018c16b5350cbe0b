//! Predicate builder: boolean filter expressions over project rows.
//!
//! # Responsibility
//! - Turn a resolved attribute plus a selection into a `Predicate`.
//! - Keep predicates free of SQL text; `ProjectQuery` renders them.
//!
//! # Invariants
//! - Building never mutates the attribute and always returns a fresh tree.
//! - Selected IDs absent from the attribute's choices are dropped.
//! - An empty selection builds no predicate.

use crate::model::attribute::{AttributeSource, ResolvedAttribute, Selection, TextLogic};
use crate::schema::catalog::{AssociationLink, ColumnType, SchemaCatalog};
use log::debug;
use rusqlite::types::Value;
use std::collections::BTreeSet;

/// Qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Boolean expression applicable as a `WHERE` clause on the project query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    InSet { column: ColumnRef, ids: Vec<i64> },
    IsNull(ColumnRef),
    Equals { column: ColumnRef, value: Value },
    /// Case-insensitive substring match.
    Contains { column: ColumnRef, needle: String },
    /// An association row links `owner` to vocabulary entry `id`.
    LinkExists {
        link: AssociationLink,
        owner: ColumnRef,
        id: i64,
    },
    /// No association row links `owner` to any vocabulary entry.
    LinkAbsent { link: AssociationLink, owner: ColumnRef },
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
    /// Projects matching any part, computed as a union of partial result
    /// sets joined back to the base query.
    UnionOf(Vec<Predicate>),
}

impl Predicate {
    /// Collapses single-part disjunctions.
    pub fn any(mut parts: Vec<Predicate>) -> Option<Predicate> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::Any(parts)),
        }
    }

    pub fn all(mut parts: Vec<Predicate>) -> Option<Predicate> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::All(parts)),
        }
    }

    /// Tables whose columns the outer query must join. Parts of a union are
    /// rendered as self-contained subqueries and only reported when
    /// `include_unions` is set.
    pub fn tables(&self, include_unions: bool, out: &mut BTreeSet<String>) {
        match self {
            Self::InSet { column, .. }
            | Self::IsNull(column)
            | Self::Equals { column, .. }
            | Self::Contains { column, .. }
            | Self::LinkExists { owner: column, .. }
            | Self::LinkAbsent { owner: column, .. } => {
                out.insert(column.table.clone());
            }
            Self::Any(parts) | Self::All(parts) => {
                for part in parts {
                    part.tables(include_unions, out);
                }
            }
            Self::UnionOf(parts) => {
                if include_unions {
                    for part in parts {
                        part.tables(include_unions, out);
                    }
                }
            }
        }
    }
}

/// Builds the filter for `selection` on `attr`.
///
/// Returns `None` when the selection constrains nothing or does not fit the
/// attribute's kind.
pub fn build_filter(
    catalog: &SchemaCatalog,
    attr: &ResolvedAttribute,
    selection: &Selection,
) -> Option<Predicate> {
    match (&attr.source, selection) {
        (_, Selection::Text { search, logic }) => {
            let columns = attr
                .source
                .text_columns()
                .into_iter()
                .map(|column| ColumnRef::new(&attr.owner_table, column))
                .collect::<Vec<_>>();
            text_filter(&columns, search, *logic)
        }
        (AttributeSource::Column { name, ty }, Selection::Value(value)) => {
            let value = typed_value(*ty, value)?;
            Some(Predicate::Equals {
                column: ColumnRef::new(&attr.owner_table, name),
                value,
            })
        }
        (AttributeSource::ForeignKey { column }, Selection::Choices { ids, include_null }) => {
            let column = ColumnRef::new(&attr.owner_table, column);
            let ids = known_ids(attr, ids);
            let mut parts = Vec::new();
            if !ids.is_empty() {
                parts.push(Predicate::InSet {
                    column: column.clone(),
                    ids,
                });
            }
            if *include_null {
                parts.push(Predicate::IsNull(column));
            }
            Predicate::any(parts)
        }
        (AttributeSource::Association(link), Selection::Choices { ids, include_null }) => {
            let owner = link_owner(catalog, attr, link);
            let mut parts = known_ids(attr, ids)
                .into_iter()
                .map(|id| Predicate::LinkExists {
                    link: link.clone(),
                    owner: owner.clone(),
                    id,
                })
                .collect::<Vec<_>>();
            if *include_null {
                parts.push(Predicate::LinkAbsent {
                    link: link.clone(),
                    owner,
                });
            }
            Predicate::any(parts)
        }
        _ => {
            debug!(
                "event=build_filter module=query status=skip key={} reason=selection_kind_mismatch",
                attr.key
            );
            None
        }
    }
}

fn text_filter(columns: &[ColumnRef], search: &str, logic: TextLogic) -> Option<Predicate> {
    let search = search.trim();
    if columns.is_empty() || search.is_empty() {
        return None;
    }
    let matching = |needle: &str| {
        Predicate::any(
            columns
                .iter()
                .map(|column| Predicate::Contains {
                    column: column.clone(),
                    needle: needle.to_string(),
                })
                .collect(),
        )
    };

    match logic {
        TextLogic::Phrase => matching(search),
        TextLogic::And => Predicate::all(search.split_whitespace().filter_map(matching).collect()),
        TextLogic::Or => {
            let mut parts = search
                .split_whitespace()
                .filter_map(matching)
                .collect::<Vec<_>>();
            match parts.len() {
                0 => None,
                1 => parts.pop(),
                _ => Some(Predicate::UnionOf(parts)),
            }
        }
    }
}

fn known_ids(attr: &ResolvedAttribute, ids: &[i64]) -> Vec<i64> {
    let mut known = ids
        .iter()
        .copied()
        .filter(|id| attr.choice(*id).is_some())
        .collect::<Vec<_>>();
    known.sort_unstable();
    known.dedup();
    known
}

/// Column of the owning table that association rows point at.
fn link_owner(
    catalog: &SchemaCatalog,
    attr: &ResolvedAttribute,
    link: &AssociationLink,
) -> ColumnRef {
    catalog
        .table(&link.table)
        .and_then(|table| table.find_column(&link.owner_column))
        .and_then(|column| column.foreign_key.as_ref())
        .map(|fk| ColumnRef::new(&fk.table, &fk.column))
        .unwrap_or_else(|| ColumnRef::new(&attr.owner_table, catalog.root_key()))
}

/// Parses `raw` as a bind value for a column of type `ty`.
pub(crate) fn typed_value(ty: ColumnType, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match ty {
        ColumnType::Integer => raw.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Float => raw.parse::<f64>().ok().map(Value::Real),
        _ => Some(Value::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{build_filter, ColumnRef, Predicate};
    use crate::model::attribute::{
        AttributeKind, AttributeSource, ResolvedAttribute, Selection, TextLogic, VocabularyEntry,
    };
    use crate::schema::catalog::ColumnType;
    use crate::schema::forms::ChoiceOrder;
    use crate::schema::portfolio::portfolio_catalog;

    fn sponsor() -> ResolvedAttribute {
        ResolvedAttribute {
            key: "sponsor".to_string(),
            owner_table: "description".to_string(),
            kind: AttributeKind::SingleReference,
            label: "sponsor".to_string(),
            source: AttributeSource::ForeignKey {
                column: "sponsorID".to_string(),
            },
            vocabulary: None,
            order: ChoiceOrder::ById,
            choices: vec![VocabularyEntry::new(1, "Dean"), VocabularyEntry::new(2, "CIO")],
        }
    }

    fn name() -> ResolvedAttribute {
        ResolvedAttribute {
            key: "name".to_string(),
            owner_table: "description".to_string(),
            kind: AttributeKind::Scalar,
            label: "name".to_string(),
            source: AttributeSource::Column {
                name: "name".to_string(),
                ty: ColumnType::String,
            },
            vocabulary: None,
            order: ChoiceOrder::ById,
            choices: Vec::new(),
        }
    }

    #[test]
    fn unknown_ids_are_dropped_and_null_is_or_ed_in() {
        let catalog = portfolio_catalog().expect("catalog");
        let selection = Selection::Choices {
            ids: vec![2, 99],
            include_null: true,
        };
        let predicate = build_filter(&catalog, &sponsor(), &selection).expect("predicate");
        let column = ColumnRef::new("description", "sponsorID");
        assert_eq!(
            predicate,
            Predicate::Any(vec![
                Predicate::InSet {
                    column: column.clone(),
                    ids: vec![2],
                },
                Predicate::IsNull(column),
            ])
        );
    }

    #[test]
    fn only_unknown_ids_build_nothing() {
        let catalog = portfolio_catalog().expect("catalog");
        assert!(build_filter(&catalog, &sponsor(), &Selection::choices([42])).is_none());
    }

    #[test]
    fn or_search_is_a_union_per_word() {
        let catalog = portfolio_catalog().expect("catalog");
        let predicate = build_filter(
            &catalog,
            &name(),
            &Selection::text("Alpha  Beta", TextLogic::Or),
        )
        .expect("predicate");
        match predicate {
            Predicate::UnionOf(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn blank_search_builds_nothing() {
        let catalog = portfolio_catalog().expect("catalog");
        assert!(build_filter(&catalog, &name(), &Selection::text("  ", TextLogic::And)).is_none());
    }
}
