//! Project reads: matching IDs, per-attribute values and brief listings.
//!
//! # Responsibility
//! - Execute planned project queries.
//! - Read the raw values of one attribute for every project.
//!
//! # Invariants
//! - Matching IDs come back distinct and ascending.
//! - Values of a one-to-many satellite keep storage order per project.

use super::{RepoError, RepoResult};
use crate::model::attribute::{AttributeSource, ResolvedAttribute};
use crate::query::plan::{ident, ProjectQuery};
use crate::schema::catalog::SchemaCatalog;
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Raw stored values of one attribute, keyed by project ID.
pub type ValuesByProject = BTreeMap<i64, Vec<Value>>;

/// Short listing entry for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BriefDescription {
    #[serde(rename = "projectID")]
    pub project_id: i64,
    pub name: Option<String>,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    #[serde(rename = "finalID")]
    pub final_id: Option<i64>,
}

/// Repository interface for project reads.
pub trait ProjectRepository {
    fn matching_ids(&self, query: &ProjectQuery) -> RepoResult<Vec<i64>>;
    fn attribute_values(&self, attr: &ResolvedAttribute) -> RepoResult<ValuesByProject>;
    fn brief_descriptions(&self) -> RepoResult<Vec<BriefDescription>>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'a> {
    conn: &'a Connection,
    catalog: &'a SchemaCatalog,
}

impl<'a> SqliteProjectRepository<'a> {
    pub fn new(conn: &'a Connection, catalog: &'a SchemaCatalog) -> Self {
        Self { conn, catalog }
    }

    /// Column of `table` holding the project ID.
    fn project_column(&self, table: &str) -> RepoResult<String> {
        let def = self
            .catalog
            .table(table)
            .ok_or_else(|| RepoError::InvalidData(format!("unknown table `{table}`")))?;
        if def.is_root() {
            return Ok(self.catalog.root_key().to_string());
        }
        self.catalog
            .join_column(table)
            .map(|column| column.name.clone())
            .ok_or_else(|| {
                RepoError::InvalidData(format!("table `{table}` does not reference a project"))
            })
    }

    fn collect_values(&self, sql: &str, value_columns: usize) -> RepoResult<ValuesByProject> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut values = ValuesByProject::new();
        while let Some(row) = rows.next()? {
            let Some(project_id) = row.get::<_, Option<i64>>(0)? else {
                continue;
            };
            let entry = values.entry(project_id).or_default();
            for index in 1..=value_columns {
                entry.push(row.get::<_, Value>(index)?);
            }
        }
        Ok(values)
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn matching_ids(&self, query: &ProjectQuery) -> RepoResult<Vec<i64>> {
        let started_at = Instant::now();
        let (sql, binds) = query.to_sql();

        let result = (|| -> RepoResult<Vec<i64>> {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            Ok(ids)
        })();

        match &result {
            Ok(ids) => info!(
                "event=query_execute module=repo status=ok joins={} predicates={} rows={} duration_ms={}",
                query.joined_tables().len(),
                query.predicates().len(),
                ids.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=query_execute module=repo status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn attribute_values(&self, attr: &ResolvedAttribute) -> RepoResult<ValuesByProject> {
        match &attr.source {
            AttributeSource::Association(link) => {
                let owner = ident(&link.owner_column);
                let sql = format!(
                    "SELECT {owner}, {} FROM {} ORDER BY {owner}, rowid;",
                    ident(&link.vocabulary_column),
                    ident(&link.table)
                );
                self.collect_values(&sql, 1)
            }
            source => {
                let columns = match source {
                    AttributeSource::Column { name, .. } => vec![name.as_str()],
                    AttributeSource::ForeignKey { column } => vec![column.as_str()],
                    AttributeSource::TextColumns(columns) => {
                        columns.iter().map(String::as_str).collect()
                    }
                    AttributeSource::Association(_) => Vec::new(),
                };
                let project = ident(&self.project_column(&attr.owner_table)?);
                let selected = columns
                    .iter()
                    .map(|column| ident(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "SELECT {project}, {selected} FROM {} ORDER BY {project}, rowid;",
                    ident(&attr.owner_table)
                );
                self.collect_values(&sql, columns.len())
            }
        }
    }

    fn brief_descriptions(&self) -> RepoResult<Vec<BriefDescription>> {
        let root = self.catalog.root();
        let key = ident(self.catalog.root_key());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {key}, \"name\", \"abstract\", \"finalID\" FROM {} ORDER BY {key} ASC;",
            ident(&root.name)
        ))?;
        let mut rows = stmt.query([])?;
        let mut briefs = Vec::new();
        while let Some(row) = rows.next()? {
            briefs.push(BriefDescription {
                project_id: row.get(0)?,
                name: row.get(1)?,
                summary: row.get(2)?,
                final_id: row.get(3)?,
            });
        }
        Ok(briefs)
    }
}
