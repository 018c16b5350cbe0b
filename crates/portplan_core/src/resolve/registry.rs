//! Startup-validated registry of attribute templates.
//!
//! # Responsibility
//! - Pre-resolve every key the forms and vocabulary relationships expose,
//!   plus the compound text-search keys.
//! - Fail fast on ambiguity instead of at request time.
//!
//! # Invariants
//! - The registry is immutable after `build`.
//! - Every registered key resolves to exactly one owning table.

use super::resolver::{locate, ResolveError};
use crate::model::attribute::{AttributeKind, AttributeSource, AttributeTemplate};
use crate::schema::catalog::{CatalogError, SchemaCatalog};
use crate::schema::forms::{ChoiceOrder, FormCatalog};
use log::{error, info};
use std::collections::BTreeMap;

/// Synthetic text-search keys spanning several root columns.
const COMPOUND_KEYS: &[(&str, &str, &[&str])] =
    &[("name_abs", "name or abstract", &["name", "abstract"])];

/// Canonical key to template mapping.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    templates: BTreeMap<String, AttributeTemplate>,
}

impl AttributeRegistry {
    /// Resolves every registered key against `catalog` and `forms`.
    ///
    /// # Errors
    /// - `CatalogError::AmbiguousAttribute` when a key matches several tables.
    /// - `CatalogError::UnknownColumn` when a form field matches nothing.
    pub fn build(
        catalog: &SchemaCatalog,
        forms: &FormCatalog,
        excluded: &[&str],
    ) -> Result<Self, CatalogError> {
        let mut keys: Vec<(String, String)> = Vec::new();
        for field in forms.fields() {
            if !excluded.contains(&field.table.as_str()) && catalog.table(&field.table).is_some() {
                keys.push((field.table.clone(), field.id.clone()));
            }
        }
        for table in catalog.tables_excluding(excluded) {
            for rel in table.relationships.iter().filter(|rel| rel.carries_vocabulary()) {
                keys.push((table.name.clone(), rel.name.clone()));
            }
        }

        let mut templates = BTreeMap::new();
        for (table, key) in keys {
            if templates.contains_key(&key) {
                continue;
            }
            let template = match locate(catalog, forms, excluded, &key) {
                Ok(template) => template,
                Err(ResolveError::AmbiguousAttribute { key, candidates }) => {
                    error!(
                        "event=registry_build module=resolve status=error key={key} error_code=ambiguous_attribute"
                    );
                    return Err(CatalogError::AmbiguousAttribute { key, candidates });
                }
                Err(err) => {
                    error!(
                        "event=registry_build module=resolve status=error key={key} error={err}"
                    );
                    return Err(CatalogError::UnknownColumn { table, column: key });
                }
            };
            templates.insert(key, template);
        }

        let root = catalog.root();
        for (key, label, columns) in COMPOUND_KEYS {
            for column in *columns {
                if root.find_column(column).is_none() {
                    return Err(CatalogError::UnknownColumn {
                        table: root.name.clone(),
                        column: (*column).to_string(),
                    });
                }
            }
            templates.insert(
                (*key).to_string(),
                AttributeTemplate {
                    key: (*key).to_string(),
                    owner_table: root.name.clone(),
                    kind: AttributeKind::Scalar,
                    label: (*label).to_string(),
                    source: AttributeSource::TextColumns(
                        columns.iter().map(|column| (*column).to_string()).collect(),
                    ),
                    vocabulary: None,
                    order: ChoiceOrder::ById,
                },
            );
        }

        info!(
            "event=registry_build module=resolve status=ok attributes={}",
            templates.len()
        );
        Ok(Self { templates })
    }

    pub fn get(&self, key: &str) -> Option<&AttributeTemplate> {
        self.templates.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::AttributeRegistry;
    use crate::model::attribute::{AttributeKind, AttributeSource};
    use crate::schema::catalog::{
        AssociationLink, Cardinality, CatalogError, ColumnDef, ColumnType, SchemaCatalog, TableDef,
        TableRole,
    };
    use crate::schema::forms::FormCatalog;
    use crate::schema::portfolio::{portfolio_catalog, portfolio_forms, HIDDEN_TABLES};

    #[test]
    fn portfolio_registry_builds_without_ambiguity() {
        let catalog = portfolio_catalog().expect("catalog");
        let registry = AttributeRegistry::build(&catalog, &portfolio_forms(), HIDDEN_TABLES)
            .expect("registry should build");

        let stakeholders = registry.get("stakeholders").expect("stakeholders registered");
        assert_eq!(stakeholders.kind, AttributeKind::MultiReference);
        assert_eq!(
            stakeholders.vocabulary.as_ref().map(|shape| shape.root.as_str()),
            Some("stakeholder")
        );

        let name_abs = registry.get("name_abs").expect("compound key registered");
        assert!(matches!(name_abs.source, AttributeSource::TextColumns(ref columns) if columns.len() == 2));

        let disposed = registry.get("disposedIn").expect("disposedIn registered");
        assert_eq!(disposed.owner_table, "latest_disposition");
    }

    #[test]
    fn ambiguous_relationship_fails_the_build() {
        let vocabulary = TableDef::new("hostlist", TableRole::Vocabulary)
            .column(ColumnDef::new("hostID", ColumnType::Integer).primary_key())
            .column(ColumnDef::new("hostDesc", ColumnType::String));
        let root = TableDef::new("description", TableRole::Root)
            .column(ColumnDef::new("projectID", ColumnType::Integer).primary_key())
            .column(ColumnDef::new("name", ColumnType::String))
            .column(ColumnDef::new("abstract", ColumnType::Text));
        let link = |table: &str| AssociationLink {
            table: table.to_string(),
            owner_column: "projectID".to_string(),
            vocabulary_column: "hostID".to_string(),
        };
        let satellite = |name: &str, link_table: &str| {
            TableDef::new(name, TableRole::Satellite { many: false })
                .column(
                    ColumnDef::new("projectID", ColumnType::Integer)
                        .primary_key()
                        .references("description", "projectID"),
                )
                .relationship("hosts", "hostlist", Cardinality::ManyToMany(link(link_table)))
        };
        let association = |name: &str| {
            TableDef::new(name, TableRole::Association)
                .column(
                    ColumnDef::new("projectID", ColumnType::Integer)
                        .references("description", "projectID"),
                )
                .column(
                    ColumnDef::new("hostID", ColumnType::Integer).references("hostlist", "hostID"),
                )
        };
        let catalog = SchemaCatalog::new(vec![
            root,
            satellite("portfolio", "portfolio_host"),
            satellite("project", "project_host"),
            association("portfolio_host"),
            association("project_host"),
            vocabulary,
        ])
        .expect("catalog validates");

        let err = AttributeRegistry::build(&catalog, &FormCatalog::default(), &[])
            .expect_err("hosts is declared on two satellites");
        match err {
            CatalogError::AmbiguousAttribute { key, candidates } => {
                assert_eq!(key, "hosts");
                assert_eq!(candidates, vec!["portfolio", "project"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
