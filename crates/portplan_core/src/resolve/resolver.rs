//! Attribute resolver: maps an attribute key to the table and relationship
//! holding its data.
//!
//! # Responsibility
//! - Consult the pre-built registry first, then locate other keys by the
//!   naming convention of the catalog.
//! - Load the vocabulary choices of reference attributes.
//!
//! # Invariants
//! - Resolution is a pure function of the catalog, the forms and the key;
//!   only `choices` depend on store contents.
//! - Back-reference relationships and columns never become attributes.
//! - Ambiguity that the heuristic cannot break is an error, never a guess.

use super::registry::AttributeRegistry;
use crate::model::attribute::{
    AttributeKind, AttributeSource, AttributeTemplate, ResolvedAttribute,
};
use crate::repo::vocabulary_repo::{SqliteVocabularyRepository, VocabularyRepository};
use crate::repo::RepoError;
use crate::schema::catalog::{
    CatalogError, Cardinality, ColumnDef, RelationshipDef, SchemaCatalog, TableDef,
};
use crate::schema::forms::{ChoiceOrder, FormCatalog};
use log::{debug, error};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PLURAL_SUFFIX: &str = "s";
const LATEST_PREFIX: &str = "latest_";

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Attribute resolution failure.
#[derive(Debug)]
pub enum ResolveError {
    /// No table, relationship or form field matches the key.
    UnknownAttribute(String),
    /// Several tables match and the heuristic cannot pick one.
    AmbiguousAttribute {
        key: String,
        candidates: Vec<String>,
    },
    Repo(RepoError),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute(key) => write!(f, "no such filter: `{key}`"),
            Self::AmbiguousAttribute { key, candidates } => write!(
                f,
                "attribute `{key}` is ambiguous between tables: {}",
                candidates.join(", ")
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ResolveError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Resolver over an immutable catalog, form catalog and registry.
#[derive(Debug)]
pub struct AttributeResolver {
    catalog: SchemaCatalog,
    forms: FormCatalog,
    excluded: Vec<String>,
    registry: AttributeRegistry,
}

impl AttributeResolver {
    /// Builds the resolver and its registry.
    ///
    /// # Errors
    /// - Returns `CatalogError` when a registered key is ambiguous or does
    ///   not resolve.
    pub fn new(
        catalog: SchemaCatalog,
        forms: FormCatalog,
        excluded: Vec<String>,
    ) -> Result<Self, CatalogError> {
        let registry = {
            let excluded = excluded.iter().map(String::as_str).collect::<Vec<_>>();
            AttributeRegistry::build(&catalog, &forms, &excluded)?
        };
        Ok(Self {
            catalog,
            forms,
            excluded,
            registry,
        })
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn forms(&self) -> &FormCatalog {
        &self.forms
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Static descriptor of `key`, without choices.
    pub fn template(&self, key: &str) -> ResolveResult<AttributeTemplate> {
        if let Some(template) = self.registry.get(key) {
            return Ok(template.clone());
        }
        let excluded = self.excluded.iter().map(String::as_str).collect::<Vec<_>>();
        locate(&self.catalog, &self.forms, &excluded, key)
    }

    /// Resolves `key` and loads its choices from `conn`.
    pub fn resolve(&self, conn: &Connection, key: &str) -> ResolveResult<ResolvedAttribute> {
        self.resolve_with(&SqliteVocabularyRepository::new(conn), key)
    }

    /// Resolves `key`, loading choices through `repo`.
    pub fn resolve_with<R: VocabularyRepository>(
        &self,
        repo: &R,
        key: &str,
    ) -> ResolveResult<ResolvedAttribute> {
        let template = self.template(key).map_err(|err| {
            match &err {
                ResolveError::AmbiguousAttribute { .. } => error!(
                    "event=resolve_attribute module=resolve status=error key={key} error={err}"
                ),
                _ => debug!(
                    "event=resolve_attribute module=resolve status=skip key={key} error={err}"
                ),
            }
            err
        })?;

        let choices = match template.vocabulary.as_ref() {
            Some(shape) => repo.load_choices(shape, template.order)?,
            None => Vec::new(),
        };
        debug!(
            "event=resolve_attribute module=resolve status=ok key={key} owner={} kind={:?} choices={}",
            template.owner_table,
            template.kind,
            choices.len()
        );
        Ok(template.into_resolved(choices))
    }
}

/// Whether relationship `name` matches attribute `key`: exactly, or as its
/// plural.
pub fn relationship_matches(name: &str, key: &str) -> bool {
    name == key
        || name
            .strip_suffix(PLURAL_SUFFIX)
            .is_some_and(|singular| singular == key)
}

/// Locates `key` by naming convention.
///
/// Order: vocabulary relationships, then plain columns, then form selection
/// fields treated as association proxies.
pub(crate) fn locate(
    catalog: &SchemaCatalog,
    forms: &FormCatalog,
    excluded: &[&str],
    key: &str,
) -> ResolveResult<AttributeTemplate> {
    let tables = catalog.tables_excluding(excluded);

    let by_relationship = tables
        .iter()
        .filter_map(|table| {
            table
                .relationships
                .iter()
                .find(|rel| rel.carries_vocabulary() && relationship_matches(&rel.name, key))
                .map(|rel| (*table, rel))
        })
        .collect::<Vec<_>>();
    if !by_relationship.is_empty() {
        let candidates = by_relationship.iter().map(|(table, _)| *table).collect();
        let owner = disambiguate(key, candidates)?;
        let (table, rel) = by_relationship
            .into_iter()
            .find(|(table, _)| table.name == owner.name)
            .ok_or_else(|| ResolveError::UnknownAttribute(key.to_string()))?;
        return reachable(catalog, key, relationship_template(catalog, forms, table, rel, key));
    }

    let by_column = tables
        .iter()
        .filter_map(|table| {
            table
                .find_column(key)
                .filter(|column| !catalog.is_back_reference(column))
                .map(|column| (*table, column))
        })
        .collect::<Vec<_>>();
    if !by_column.is_empty() {
        let candidates = by_column.iter().map(|(table, _)| *table).collect();
        let owner = disambiguate(key, candidates)?;
        let (table, column) = by_column
            .into_iter()
            .find(|(table, _)| table.name == owner.name)
            .ok_or_else(|| ResolveError::UnknownAttribute(key.to_string()))?;
        return reachable(catalog, key, column_template(catalog, forms, table, column));
    }

    for field in forms.fields().iter().filter(|field| field.id == key) {
        let Some(source) = field.choice_source() else {
            continue;
        };
        if excluded.contains(&field.table.as_str()) {
            continue;
        }
        let (Some(link), Some(shape)) = (
            catalog.association_between(&field.table, &source.vocabulary),
            catalog.vocabulary(&source.vocabulary),
        ) else {
            continue;
        };
        return Ok(AttributeTemplate {
            key: key.to_string(),
            owner_table: field.table.clone(),
            kind: AttributeKind::MultiReference,
            label: field.label.clone(),
            source: AttributeSource::Association(link),
            vocabulary: Some(shape.clone()),
            order: source.order,
        });
    }

    Err(ResolveError::UnknownAttribute(key.to_string()))
}

/// Narrows candidate tables to one.
///
/// Rules, applied in order until one table remains: prefer the table where
/// `key` is a foreign-key column; prefer `latest_<t>` over `<t>`; prefer
/// non-vocabulary tables; drop the root table.
pub(crate) fn disambiguate<'c>(
    key: &str,
    candidates: Vec<&'c TableDef>,
) -> ResolveResult<&'c TableDef> {
    type Rule = fn(&str, &[&TableDef], &TableDef) -> bool;
    let rules: [Rule; 4] = [
        |key, _, table| {
            table
                .find_column(key)
                .is_some_and(|column| column.foreign_key.is_some())
        },
        |_, set, table| {
            !set.iter()
                .any(|other| other.name == format!("{LATEST_PREFIX}{}", table.name))
        },
        |_, _, table| !table.is_vocabulary(),
        |_, _, table| !table.is_root(),
    ];

    let mut set = candidates;
    for rule in rules {
        if set.len() == 1 {
            break;
        }
        let narrowed = set
            .iter()
            .copied()
            .filter(|table| rule(key, &set, table))
            .collect::<Vec<_>>();
        if !narrowed.is_empty() {
            set = narrowed;
        }
    }

    match set.as_slice() {
        [only] => Ok(*only),
        _ => Err(ResolveError::AmbiguousAttribute {
            key: key.to_string(),
            candidates: set.iter().map(|table| table.name.clone()).collect(),
        }),
    }
}

fn reachable(
    catalog: &SchemaCatalog,
    key: &str,
    template: ResolveResult<AttributeTemplate>,
) -> ResolveResult<AttributeTemplate> {
    let template = template?;
    if catalog.reachable_from_root(&template.owner_table) {
        Ok(template)
    } else {
        debug!(
            "event=resolve_attribute module=resolve status=skip key={key} owner={} reason=unreachable",
            template.owner_table
        );
        Err(ResolveError::UnknownAttribute(key.to_string()))
    }
}

fn label_and_order(forms: &FormCatalog, table: &str, key: &str) -> (String, ChoiceOrder) {
    match forms.field(table, key) {
        Some(field) => (
            field.label.clone(),
            field
                .choice_source()
                .map_or(ChoiceOrder::ById, |source| source.order),
        ),
        None => (key.to_string(), ChoiceOrder::ById),
    }
}

fn relationship_template(
    catalog: &SchemaCatalog,
    forms: &FormCatalog,
    table: &TableDef,
    rel: &RelationshipDef,
    key: &str,
) -> ResolveResult<AttributeTemplate> {
    let shape = catalog
        .vocabulary(&rel.target)
        .ok_or_else(|| ResolveError::UnknownAttribute(key.to_string()))?;
    let (kind, source) = match &rel.cardinality {
        Cardinality::ManyToOne { column } => (
            AttributeKind::SingleReference,
            AttributeSource::ForeignKey {
                column: column.clone(),
            },
        ),
        Cardinality::ManyToMany(link) => (
            AttributeKind::MultiReference,
            AttributeSource::Association(link.clone()),
        ),
        Cardinality::BackReference => {
            return Err(ResolveError::UnknownAttribute(key.to_string()));
        }
    };
    let (label, order) = label_and_order(forms, &table.name, &rel.name);
    Ok(AttributeTemplate {
        key: rel.name.clone(),
        owner_table: table.name.clone(),
        kind,
        label,
        source,
        vocabulary: Some(shape.clone()),
        order,
    })
}

fn column_template(
    catalog: &SchemaCatalog,
    forms: &FormCatalog,
    table: &TableDef,
    column: &ColumnDef,
) -> ResolveResult<AttributeTemplate> {
    let (label, order) = label_and_order(forms, &table.name, &column.name);
    let vocabulary = column
        .foreign_key
        .as_ref()
        .and_then(|fk| catalog.vocabulary(&fk.table));
    let (kind, source) = match vocabulary {
        Some(_) => (
            AttributeKind::SingleReference,
            AttributeSource::ForeignKey {
                column: column.name.clone(),
            },
        ),
        None => (
            AttributeKind::Scalar,
            AttributeSource::Column {
                name: column.name.clone(),
                ty: column.ty,
            },
        ),
    };
    Ok(AttributeTemplate {
        key: column.name.clone(),
        owner_table: table.name.clone(),
        kind,
        label,
        source,
        vocabulary: vocabulary.cloned(),
        order,
    })
}
