//! Core engine of the project-portfolio planner.
//! Resolves attribute keys against the portfolio schema, turns filter
//! selections into queries, and shapes breakdowns and reports.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod service;

pub use config::{ConfigError, ReportConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attribute::{
    AttributeKind, AttributeSource, ResolvedAttribute, Selection, TextLogic, VocabularyEntry,
};
pub use query::codec::{decode, encode, EncodedQuery};
pub use query::filter::FilterSet;
pub use report::breakdown::Bucket;
pub use repo::{RepoError, RepoResult};
pub use resolve::resolver::{AttributeResolver, ResolveError, ResolveResult};
pub use schema::catalog::{CatalogError, SchemaCatalog};
pub use schema::forms::FormCatalog;
pub use service::report_service::{ReportResponse, ReportService, ReportServiceError};

/// Resolver over the built-in portfolio schema, hiding the tables named by
/// `config`.
pub fn portfolio_resolver(config: &ReportConfig) -> Result<AttributeResolver, CatalogError> {
    AttributeResolver::new(
        schema::portfolio::portfolio_catalog()?,
        schema::portfolio::portfolio_forms(),
        config.hidden_tables.clone(),
    )
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, portfolio_resolver, ReportConfig};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn default_resolver_builds() {
        let resolver = portfolio_resolver(&ReportConfig::default()).expect("resolver builds");
        assert!(!resolver.registry().is_empty());
    }
}
