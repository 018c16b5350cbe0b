//! Static schema catalog: tables, columns, relationships and association links.
//!
//! # Responsibility
//! - Describe every table the engine may resolve attributes against.
//! - Expose read-only lookups (`tables_excluding`, `relationships_of`,
//!   `columns_of`) used by the attribute resolver.
//! - Validate the declaration once at startup.
//!
//! # Invariants
//! - Exactly one table has the `Root` role.
//! - Every vocabulary table follows the `<root>list` / `<root>ID` /
//!   `<root>Desc` naming convention.
//! - Back-references are lookup keys only: a foreign key that points at a
//!   working table never makes its column an attribute.

use crate::db::DbError;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

static VOCABULARY_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<root>\w+)list$").expect("valid vocabulary table regex"));
static ID_COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<root>\w+)ID$").expect("valid id column regex"));

/// Naming suffix shared by every vocabulary table.
pub const VOCABULARY_SUFFIX: &str = "list";

/// Startup configuration error. Always fatal.
#[derive(Debug)]
pub enum CatalogError {
    DuplicateTable(String),
    MissingRoot,
    MultipleRoots(Vec<String>),
    UnknownTable {
        table: String,
        referenced_by: String,
    },
    UnknownColumn {
        table: String,
        column: String,
    },
    VocabularyNaming(String),
    /// A declared column is absent from the live store.
    MissingStoreColumn {
        table: String,
        column: String,
    },
    /// A registered attribute key cannot be narrowed to one table.
    AmbiguousAttribute {
        key: String,
        candidates: Vec<String>,
    },
    Store(DbError),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTable(name) => write!(f, "table `{name}` declared twice"),
            Self::MissingRoot => write!(f, "catalog declares no root table"),
            Self::MultipleRoots(names) => {
                write!(f, "catalog declares several root tables: {}", names.join(", "))
            }
            Self::UnknownTable {
                table,
                referenced_by,
            } => write!(f, "`{referenced_by}` references unknown table `{table}`"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{table}.{column}`")
            }
            Self::VocabularyNaming(table) => write!(
                f,
                "vocabulary table `{table}` does not follow the `<root>list` naming convention"
            ),
            Self::MissingStoreColumn { table, column } => {
                write!(f, "store has no column `{table}.{column}`")
            }
            Self::AmbiguousAttribute { key, candidates } => write!(
                f,
                "attribute `{key}` is ambiguous between tables: {}",
                candidates.join(", ")
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for CatalogError {
    fn from(value: DbError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DbError::Sqlite(value))
    }
}

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Short, bounded text.
    String,
    /// Long free text.
    Text,
    Date,
    Timestamp,
    Integer,
    Float,
}

impl ColumnType {
    pub fn is_text(self) -> bool {
        matches!(self, Self::String | Self::Text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            foreign_key: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// Many-to-many link between a working table and a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationLink {
    /// Association table holding one row per (project, vocabulary entry).
    pub table: String,
    /// Column pointing back at the owning table's `projectID`.
    pub owner_column: String,
    /// Column holding the vocabulary entry ID.
    pub vocabulary_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality {
    /// Foreign-key column on the owning table pointing at a vocabulary.
    ManyToOne { column: String },
    /// Association proxy through a link table.
    ManyToMany(AssociationLink),
    /// Navigation back to (or between) working tables; never an attribute.
    BackReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDef {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
}

impl RelationshipDef {
    /// Whether the relationship leads to a controlled vocabulary.
    pub fn carries_vocabulary(&self) -> bool {
        !matches!(self.cardinality, Cardinality::BackReference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Root,
    /// Satellite keyed by the root `projectID`. `many` marks 1:N satellites.
    Satellite {
        many: bool,
    },
    Association,
    Vocabulary,
    /// Internal table never offered for resolution.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub role: TableRole,
    pub columns: Vec<ColumnDef>,
    pub relationships: Vec<RelationshipDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>, role: TableRole) -> Self {
        Self {
            name: name.into(),
            role,
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relationship(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.relationships.push(RelationshipDef {
            name: name.into(),
            target: target.into(),
            cardinality,
        });
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn find_relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    pub fn is_vocabulary(&self) -> bool {
        self.role == TableRole::Vocabulary || self.name.ends_with(VOCABULARY_SUFFIX)
    }

    pub fn is_root(&self) -> bool {
        self.role == TableRole::Root
    }
}

/// Column names of one vocabulary table, derived from the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyShape {
    pub table: String,
    /// Naming stem, e.g. `strategy` for `strategylist`.
    pub root: String,
    pub id_column: String,
    pub desc_column: String,
}

/// Read-only registry of the store layout.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    tables: Vec<TableDef>,
    vocabularies: BTreeMap<String, VocabularyShape>,
}

impl SchemaCatalog {
    /// Builds and validates a catalog.
    ///
    /// # Errors
    /// - Returns `CatalogError` when the declaration is inconsistent.
    pub fn new(tables: Vec<TableDef>) -> Result<Self, CatalogError> {
        let mut catalog = Self {
            tables,
            vocabularies: BTreeMap::new(),
        };
        match catalog.validate() {
            Ok(()) => {
                info!(
                    "event=catalog_validate module=schema status=ok tables={} vocabularies={}",
                    catalog.tables.len(),
                    catalog.vocabularies.len()
                );
                Ok(catalog)
            }
            Err(err) => {
                error!("event=catalog_validate module=schema status=error error={err}");
                Err(err)
            }
        }
    }

    /// Entity tables in declaration order, skipping hidden tables and `names`.
    pub fn tables_excluding(&self, names: &[&str]) -> Vec<&TableDef> {
        self.tables
            .iter()
            .filter(|table| table.role != TableRole::Hidden)
            .filter(|table| !names.contains(&table.name.as_str()))
            .collect()
    }

    pub fn relationships_of(&self, table: &str) -> BTreeMap<&str, &RelationshipDef> {
        self.table(table)
            .map(|def| {
                def.relationships
                    .iter()
                    .map(|rel| (rel.name.as_str(), rel))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn columns_of(&self, table: &str) -> BTreeMap<&str, &ColumnDef> {
        self.table(table)
            .map(|def| {
                def.columns
                    .iter()
                    .map(|column| (column.name.as_str(), column))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// The root entity table. Validation guarantees it exists.
    pub fn root(&self) -> &TableDef {
        self.tables
            .iter()
            .find(|table| table.is_root())
            .unwrap_or(&self.tables[0])
    }

    /// Primary-key column of the root table.
    pub fn root_key(&self) -> &str {
        self.root()
            .columns
            .iter()
            .find(|column| column.primary_key)
            .map_or("projectID", |column| column.name.as_str())
    }

    pub fn vocabulary(&self, table: &str) -> Option<&VocabularyShape> {
        self.vocabularies.get(table)
    }

    /// Whether `column` only links its table back to a working table.
    pub fn is_back_reference(&self, column: &ColumnDef) -> bool {
        column.foreign_key.as_ref().is_some_and(|fk| {
            self.table(&fk.table)
                .is_some_and(|target| !target.is_vocabulary())
        })
    }

    /// Column joining `table` back to the root key, `None` for the root itself
    /// and for tables unreachable from it.
    pub fn join_column(&self, table: &str) -> Option<&ColumnDef> {
        let def = self.table(table)?;
        if def.is_root() {
            return None;
        }
        def.columns
            .iter()
            .find(|column| self.is_back_reference(column))
    }

    /// Whether rows of `table` can be related to a project.
    pub fn reachable_from_root(&self, table: &str) -> bool {
        self.table(table)
            .is_some_and(|def| def.is_root() || self.join_column(table).is_some())
    }

    /// Finds the association link from `owner` to `vocabulary`, if one exists.
    ///
    /// Dedicated association tables win over one-to-one satellites, which win
    /// over one-to-many history tables.
    pub fn association_between(&self, owner: &str, vocabulary: &str) -> Option<AssociationLink> {
        let owner_key = self
            .table(owner)?
            .columns
            .iter()
            .find(|column| column.primary_key)?;
        let shape = self.vocabulary(vocabulary)?;

        self.tables
            .iter()
            .filter_map(|table| {
                let owner_column = table.columns.iter().find(|column| {
                    column
                        .foreign_key
                        .as_ref()
                        .is_some_and(|fk| fk.table == owner && fk.column == owner_key.name)
                })?;
                let vocabulary_column = table.columns.iter().find(|column| {
                    column.foreign_key.as_ref().is_some_and(|fk| {
                        fk.table == shape.table && fk.column == shape.id_column
                    })
                })?;
                let link = AssociationLink {
                    table: table.name.clone(),
                    owner_column: owner_column.name.clone(),
                    vocabulary_column: vocabulary_column.name.clone(),
                };
                Some((link_rank(table.role), link))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, link)| link)
    }

    /// Checks that every declared table and column exists in the live store.
    pub fn verify_store(&self, conn: &Connection) -> Result<(), CatalogError> {
        for table in &self.tables {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\");", table.name))?;
            let mut rows = stmt.query([])?;
            let mut present = BTreeSet::new();
            while let Some(row) = rows.next()? {
                let name: String = row.get(1)?;
                present.insert(name);
            }
            for column in &table.columns {
                if !present.contains(&column.name) {
                    error!(
                        "event=catalog_verify module=schema status=error table={} column={}",
                        table.name, column.name
                    );
                    return Err(CatalogError::MissingStoreColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        info!("event=catalog_verify module=schema status=ok");
        Ok(())
    }

    fn validate(&mut self) -> Result<(), CatalogError> {
        let mut seen = BTreeSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(CatalogError::DuplicateTable(table.name.clone()));
            }
        }

        let roots = self
            .tables
            .iter()
            .filter(|table| table.is_root())
            .map(|table| table.name.clone())
            .collect::<Vec<_>>();
        match roots.len() {
            0 => return Err(CatalogError::MissingRoot),
            1 => {}
            _ => return Err(CatalogError::MultipleRoots(roots)),
        }

        let mut vocabularies = BTreeMap::new();
        for table in self.tables.iter().filter(|table| table.role == TableRole::Vocabulary) {
            let shape = vocabulary_shape(table)?;
            vocabularies.insert(table.name.clone(), shape);
        }
        self.vocabularies = vocabularies;

        for table in &self.tables {
            for column in &table.columns {
                if let Some(fk) = column.foreign_key.as_ref() {
                    self.require_column(&fk.table, &fk.column, &table.name)?;
                }
            }
            for rel in &table.relationships {
                if self.table(&rel.target).is_none() {
                    return Err(CatalogError::UnknownTable {
                        table: rel.target.clone(),
                        referenced_by: format!("{}.{}", table.name, rel.name),
                    });
                }
                match &rel.cardinality {
                    Cardinality::ManyToOne { column } => {
                        self.require_column(&table.name, column, &table.name)?;
                        self.require_vocabulary(&rel.target, &table.name, &rel.name)?;
                    }
                    Cardinality::ManyToMany(link) => {
                        self.require_column(&link.table, &link.owner_column, &table.name)?;
                        self.require_column(&link.table, &link.vocabulary_column, &table.name)?;
                        self.require_vocabulary(&rel.target, &table.name, &rel.name)?;
                    }
                    Cardinality::BackReference => {}
                }
            }
        }

        Ok(())
    }

    fn require_column(
        &self,
        table: &str,
        column: &str,
        referenced_by: &str,
    ) -> Result<(), CatalogError> {
        let def = self.table(table).ok_or_else(|| CatalogError::UnknownTable {
            table: table.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
        if def.find_column(column).is_none() {
            return Err(CatalogError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        Ok(())
    }

    fn require_vocabulary(
        &self,
        target: &str,
        table: &str,
        relationship: &str,
    ) -> Result<(), CatalogError> {
        if self.vocabularies.contains_key(target) {
            return Ok(());
        }
        Err(CatalogError::UnknownTable {
            table: target.to_string(),
            referenced_by: format!("{table}.{relationship}"),
        })
    }
}

fn link_rank(role: TableRole) -> u8 {
    match role {
        TableRole::Association => 0,
        TableRole::Satellite { many: false } => 1,
        _ => 2,
    }
}

fn vocabulary_shape(table: &TableDef) -> Result<VocabularyShape, CatalogError> {
    let naming_error = || CatalogError::VocabularyNaming(table.name.clone());

    let table_root = VOCABULARY_TABLE_RE
        .captures(&table.name)
        .and_then(|caps| caps.name("root"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(naming_error)?;

    let id_column = table
        .columns
        .iter()
        .find(|column| column.primary_key)
        .ok_or_else(naming_error)?;
    let root = ID_COLUMN_RE
        .captures(&id_column.name)
        .and_then(|caps| caps.name("root"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(naming_error)?;
    if root != table_root {
        return Err(naming_error());
    }

    let desc_column = format!("{root}Desc");
    if table.find_column(&desc_column).is_none() {
        return Err(naming_error());
    }

    Ok(VocabularyShape {
        table: table.name.clone(),
        root,
        id_column: id_column.name.clone(),
        desc_column,
    })
}
