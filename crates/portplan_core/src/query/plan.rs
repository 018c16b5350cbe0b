//! Project query plan: base selection, joins and predicates rendered to SQL.
//!
//! # Invariants
//! - The query always selects distinct root keys in ascending order.
//! - A satellite is joined at most once, keyed by table name.
//! - Every value reaches SQLite as a bound parameter.
//! - Substring matches compare case-folded text on both sides.

use super::predicate::{ColumnRef, Predicate};
use super::QueryError;
use crate::db::functions::CASEFOLD_FUNCTION;
use crate::schema::catalog::SchemaCatalog;
use rusqlite::types::Value;
use std::collections::{BTreeMap, BTreeSet};

const LIKE_ESCAPE: char = '\\';

/// Quotes an SQL identifier.
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_sql(column: &ColumnRef) -> String {
    format!("{}.{}", ident(&column.table), ident(&column.column))
}

fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Selection of project IDs from the root table.
#[derive(Debug, Clone)]
pub struct ProjectQuery {
    root: String,
    root_key: String,
    join_columns: BTreeMap<String, String>,
    joins: Vec<String>,
    predicates: Vec<Predicate>,
}

impl ProjectQuery {
    /// Unfiltered query over every project.
    pub fn new(catalog: &SchemaCatalog) -> Self {
        let join_columns = catalog
            .tables_excluding(&[])
            .into_iter()
            .filter_map(|table| {
                catalog
                    .join_column(&table.name)
                    .map(|column| (table.name.clone(), column.name.clone()))
            })
            .collect();
        Self {
            root: catalog.root().name.clone(),
            root_key: catalog.root_key().to_string(),
            join_columns,
            joins: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Adds a `LEFT JOIN` of `table` back to the root. Idempotent.
    pub fn join(&mut self, table: &str) -> Result<(), QueryError> {
        if table == self.root || self.joins.iter().any(|joined| joined == table) {
            return Ok(());
        }
        self.require_reachable(table)?;
        self.joins.push(table.to_string());
        Ok(())
    }

    /// ANDs `predicate` into the query, joining the tables it reads.
    pub fn filter(&mut self, predicate: Predicate) -> Result<(), QueryError> {
        let mut every_table = BTreeSet::new();
        predicate.tables(true, &mut every_table);
        for table in &every_table {
            self.require_reachable(table)?;
        }

        let mut outer_tables = BTreeSet::new();
        predicate.tables(false, &mut outer_tables);
        for table in &outer_tables {
            self.join(table)?;
        }
        self.predicates.push(predicate);
        Ok(())
    }

    pub fn joined_tables(&self) -> &[String] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Renders the statement and its bind values.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut binds = Vec::new();
        let predicates = self.predicates.iter().collect::<Vec<_>>();
        self.render_select(&self.joins, &predicates, &mut sql, &mut binds);
        sql.push_str(&format!(" ORDER BY {} ASC;", self.root_key_sql()));
        (sql, binds)
    }

    fn require_reachable(&self, table: &str) -> Result<(), QueryError> {
        if table == self.root || self.join_columns.contains_key(table) {
            Ok(())
        } else {
            Err(QueryError::Unreachable(table.to_string()))
        }
    }

    fn root_key_sql(&self) -> String {
        column_sql(&ColumnRef::new(&self.root, &self.root_key))
    }

    fn render_select(
        &self,
        joins: &[String],
        predicates: &[&Predicate],
        sql: &mut String,
        binds: &mut Vec<Value>,
    ) {
        let root_key = self.root_key_sql();
        sql.push_str(&format!("SELECT DISTINCT {root_key} FROM {}", ident(&self.root)));
        for table in joins {
            if let Some(column) = self.join_columns.get(table) {
                sql.push_str(&format!(
                    " LEFT JOIN {} ON {} = {root_key}",
                    ident(table),
                    column_sql(&ColumnRef::new(table, column))
                ));
            }
        }
        for (index, predicate) in predicates.iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            self.render_predicate(predicate, sql, binds);
        }
    }

    fn render_predicate(&self, predicate: &Predicate, sql: &mut String, binds: &mut Vec<Value>) {
        match predicate {
            Predicate::InSet { column, ids } => {
                if ids.is_empty() {
                    sql.push_str("0");
                    return;
                }
                let placeholders = vec!["?"; ids.len()].join(", ");
                sql.push_str(&format!("{} IN ({placeholders})", column_sql(column)));
                binds.extend(ids.iter().map(|id| Value::Integer(*id)));
            }
            Predicate::IsNull(column) => {
                sql.push_str(&format!("{} IS NULL", column_sql(column)));
            }
            Predicate::Equals { column, value } => {
                sql.push_str(&format!("{} = ?", column_sql(column)));
                binds.push(value.clone());
            }
            Predicate::Contains { column, needle } => {
                sql.push_str(&format!(
                    "{CASEFOLD_FUNCTION}({}) LIKE ? ESCAPE '{LIKE_ESCAPE}'",
                    column_sql(column)
                ));
                binds.push(Value::Text(like_pattern(&needle.to_lowercase())));
            }
            Predicate::LinkExists { link, owner, id } => {
                sql.push_str(&format!(
                    "EXISTS (SELECT 1 FROM {} AS link WHERE link.{} = {} AND link.{} = ?)",
                    ident(&link.table),
                    ident(&link.owner_column),
                    column_sql(owner),
                    ident(&link.vocabulary_column)
                ));
                binds.push(Value::Integer(*id));
            }
            Predicate::LinkAbsent { link, owner } => {
                sql.push_str(&format!(
                    "NOT EXISTS (SELECT 1 FROM {} AS link WHERE link.{} = {} AND link.{} IS NOT NULL)",
                    ident(&link.table),
                    ident(&link.owner_column),
                    column_sql(owner),
                    ident(&link.vocabulary_column)
                ));
            }
            Predicate::Any(parts) => self.render_group(parts, " OR ", "0", sql, binds),
            Predicate::All(parts) => self.render_group(parts, " AND ", "1", sql, binds),
            Predicate::UnionOf(parts) => {
                if parts.is_empty() {
                    sql.push_str("0");
                    return;
                }
                sql.push_str(&format!("{} IN (", self.root_key_sql()));
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" UNION ");
                    }
                    let mut tables = BTreeSet::new();
                    part.tables(false, &mut tables);
                    let joins = tables
                        .into_iter()
                        .filter(|table| *table != self.root)
                        .collect::<Vec<_>>();
                    self.render_select(&joins, &[part], sql, binds);
                }
                sql.push(')');
            }
        }
    }

    fn render_group(
        &self,
        parts: &[Predicate],
        separator: &str,
        empty: &str,
        sql: &mut String,
        binds: &mut Vec<Value>,
    ) {
        if parts.is_empty() {
            sql.push_str(empty);
            return;
        }
        sql.push('(');
        for (index, part) in parts.iter().enumerate() {
            if index > 0 {
                sql.push_str(separator);
            }
            self.render_predicate(part, sql, binds);
        }
        sql.push(')');
    }
}
