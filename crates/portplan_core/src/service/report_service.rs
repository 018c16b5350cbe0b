//! Report use-case service.
//!
//! # Responsibility
//! - Provide the report, breakdown and listing entry points for callers.
//! - Map engine failures onto caller-facing error categories.
//!
//! # Invariants
//! - Unknown report columns and filter keys are skipped, never fatal.
//! - An unknown breakdown key is a caller error; ambiguity is internal.

use crate::config::ReportConfig;
use crate::model::attribute::ResolvedAttribute;
use crate::query::codec;
use crate::query::filter::FilterSet;
use crate::query::QueryError;
use crate::report::breakdown::{breakdown, BreakdownError, Bucket};
use crate::report::projector::{self, ColumnMeta, TableOptions};
use crate::repo::project_repo::{BriefDescription, ProjectRepository, SqliteProjectRepository};
use crate::repo::RepoError;
use crate::resolve::resolver::{AttributeResolver, ResolveError};
use crate::schema::forms::SelectFieldLabel;
use log::{error, info, warn};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const PROJECT_ID_COLUMN: &str = "projectID";

pub type ReportResult<T> = Result<T, ReportServiceError>;

/// Caller-facing report failure.
#[derive(Debug)]
pub enum ReportServiceError {
    /// The requested attribute does not exist (a bad request).
    UnknownAttribute(String),
    /// Schema inconsistency or planning failure.
    Internal(String),
    /// The store failed while executing a query.
    Query(RepoError),
}

impl Display for ReportServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute(key) => write!(f, "no such filter: `{key}`"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
            Self::Query(err) => write!(f, "query failed: {err}"),
        }
    }
}

impl Error for ReportServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolveError> for ReportServiceError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::UnknownAttribute(key) => Self::UnknownAttribute(key),
            ResolveError::Repo(err) => Self::Query(err),
            ambiguous @ ResolveError::AmbiguousAttribute { .. } => {
                Self::Internal(ambiguous.to_string())
            }
        }
    }
}

impl From<RepoError> for ReportServiceError {
    fn from(value: RepoError) -> Self {
        Self::Query(value)
    }
}

impl From<QueryError> for ReportServiceError {
    fn from(value: QueryError) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<BreakdownError> for ReportServiceError {
    fn from(value: BreakdownError) -> Self {
        match value {
            BreakdownError::Query(err) => err.into(),
            BreakdownError::Repo(err) => err.into(),
        }
    }
}

/// Report table with the filter that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    pub data: Vec<Map<String, JsonValue>>,
    pub columns: Vec<ColumnMeta>,
    pub options: TableOptions,
    #[serde(rename = "projectList")]
    pub project_list: Vec<i64>,
    pub query_desc: String,
    pub query_string: String,
}

/// Use-case service over one store connection.
pub struct ReportService<'a> {
    conn: &'a Connection,
    resolver: &'a AttributeResolver,
    config: &'a ReportConfig,
}

impl<'a> ReportService<'a> {
    pub fn new(
        conn: &'a Connection,
        resolver: &'a AttributeResolver,
        config: &'a ReportConfig,
    ) -> Self {
        Self {
            conn,
            resolver,
            config,
        }
    }

    fn repo(&self) -> SqliteProjectRepository<'a> {
        SqliteProjectRepository::new(self.conn, self.resolver.catalog())
    }

    /// Filters projects by `query_string` and projects `columns`.
    ///
    /// # Contract
    /// - Empty `columns` selects the configured default columns.
    /// - `projectID` and unknown column keys are skipped.
    pub fn report(&self, query_string: &str, columns: &[String]) -> ReportResult<ReportResponse> {
        let started_at = Instant::now();
        let result = self.build_report(query_string, columns);
        match &result {
            Ok(response) => info!(
                "event=report module=service status=ok columns={} rows={} duration_ms={}",
                response.columns.len(),
                response.project_list.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=report module=service status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Buckets of attribute `key`.
    pub fn breakdown(&self, key: &str) -> ReportResult<Vec<Bucket>> {
        let attr = self.resolver.resolve(self.conn, key).map_err(|err| {
            warn!("event=breakdown module=service status=error key={key} error={err}");
            ReportServiceError::from(err)
        })?;
        Ok(breakdown(self.resolver.catalog(), &self.repo(), &attr)?)
    }

    /// Selection fields offered for breakdowns, sorted by label.
    pub fn breakdown_choices(&self) -> Vec<SelectFieldLabel> {
        self.resolver.forms().select_field_labels()
    }

    /// `{projectID, name, abstract, finalID}` of every project.
    pub fn brief_descriptions(&self) -> ReportResult<Vec<BriefDescription>> {
        Ok(self.repo().brief_descriptions()?)
    }

    fn build_report(&self, query_string: &str, columns: &[String]) -> ReportResult<ReportResponse> {
        let columns = if columns.is_empty() {
            self.config.default_columns.as_slice()
        } else {
            columns
        };
        let attrs = self.resolve_columns(columns)?;

        let decoded = codec::decode(query_string);
        let filters = FilterSet::from_query(self.resolver, self.conn, &decoded)?;
        let query = filters.to_query(self.resolver.catalog())?;

        let repo = self.repo();
        let project_ids = repo.matching_ids(&query)?;
        let projection =
            projector::project(&repo, &attrs, &project_ids, self.config.projector_settings())?;
        let encoded = filters.encode();

        Ok(ReportResponse {
            data: projection.data,
            columns: projection.columns,
            options: projection.options,
            project_list: project_ids,
            query_desc: encoded.description,
            query_string: encoded.query_string,
        })
    }

    fn resolve_columns(&self, columns: &[String]) -> ReportResult<Vec<ResolvedAttribute>> {
        let mut attrs = Vec::with_capacity(columns.len());
        for key in columns {
            if key == PROJECT_ID_COLUMN {
                continue;
            }
            match self.resolver.resolve(self.conn, key) {
                Ok(attr) => attrs.push(attr),
                Err(ResolveError::UnknownAttribute(_)) => {
                    warn!("event=report module=service status=skip column={key} reason=unknown_attribute");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(attrs)
    }
}
