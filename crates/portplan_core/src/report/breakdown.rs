//! Breakdown aggregator: partitions projects by the values of one attribute.
//!
//! # Invariants
//! - One bucket per choice, in choice order.
//! - A `MultiReference` attribute gets a leading null bucket described as
//!   `no <label>`.
//! - Each bucket is computed independently; a project may appear in several
//!   buckets only for `MultiReference` attributes.

use crate::model::attribute::{ResolvedAttribute, Selection};
use crate::query::filter::FilterSet;
use crate::query::QueryError;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::RepoError;
use crate::schema::catalog::SchemaCatalog;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Projects sharing one value of the broken-down attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub description: String,
    #[serde(rename = "projectIDs")]
    pub project_ids: Vec<i64>,
    pub query_desc: String,
    pub query_string: String,
}

#[derive(Debug)]
pub enum BreakdownError {
    Query(QueryError),
    Repo(RepoError),
}

impl Display for BreakdownError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BreakdownError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<QueryError> for BreakdownError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<RepoError> for BreakdownError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Buckets of `attr`, null bucket first when allowed.
pub fn breakdown<R: ProjectRepository>(
    catalog: &SchemaCatalog,
    repo: &R,
    attr: &ResolvedAttribute,
) -> Result<Vec<Bucket>, BreakdownError> {
    let mut selections = Vec::with_capacity(attr.choices.len() + 1);
    if attr.allows_null_bucket() {
        selections.push((format!("no {}", attr.label), Selection::null_only()));
    }
    selections.extend(
        attr.choices
            .iter()
            .map(|choice| (choice.display().to_string(), Selection::choices([choice.id]))),
    );

    let mut buckets = Vec::with_capacity(selections.len());
    for (description, selection) in selections {
        let mut filters = FilterSet::new();
        filters.push(attr.clone(), selection);
        let project_ids = repo.matching_ids(&filters.to_query(catalog)?)?;
        let encoded = filters.encode();
        buckets.push(Bucket {
            description,
            project_ids,
            query_desc: encoded.description,
            query_string: encoded.query_string,
        });
    }

    info!(
        "event=breakdown module=report status=ok key={} buckets={}",
        attr.key,
        buckets.len()
    );
    Ok(buckets)
}
