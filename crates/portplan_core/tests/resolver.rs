mod common;

use portplan_core::schema::catalog::ColumnType;
use portplan_core::{AttributeKind, AttributeSource, ResolveError};

#[test]
fn plural_key_resolves_to_association_on_root() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    let attr = resolver.resolve(&conn, "stakeholders").unwrap();
    assert_eq!(attr.kind, AttributeKind::MultiReference);
    assert_eq!(attr.owner_table, "description");
    assert_eq!(attr.root(), Some("stakeholder"));
    match &attr.source {
        AttributeSource::Association(link) => {
            assert_eq!(link.table, "stakeholder");
            assert_eq!(link.vocabulary_column, "stakeholderID");
        }
        other => panic!("unexpected source: {other:?}"),
    }

    let names = attr
        .choices
        .iter()
        .map(|entry| entry.description.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Faculty", "Staff", "Students"]);
}

#[test]
fn singular_key_resolves_to_foreign_key_reference() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    let attr = resolver.resolve(&conn, "sponsor").unwrap();
    assert_eq!(attr.kind, AttributeKind::SingleReference);
    assert_eq!(attr.owner_table, "description");
    assert_eq!(
        attr.source,
        AttributeSource::ForeignKey {
            column: "sponsorID".to_string()
        }
    );
    assert!(attr.choice(0).is_some());
    assert!(!attr.allows_null_bucket());
}

#[test]
fn resolution_is_deterministic() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    for key in ["stakeholders", "maturity", "name_abs", "latest_dispositions", "flavor"] {
        let first = resolver.resolve(&conn, key).unwrap();
        let second = resolver.resolve(&conn, key).unwrap();
        assert_eq!(first, second, "{key} resolved differently");
    }
}

#[test]
fn disposition_prefers_the_latest_table() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    let attr = resolver.resolve(&conn, "disposition").unwrap();
    assert_eq!(attr.owner_table, "latest_disposition");
    assert_eq!(attr.kind, AttributeKind::SingleReference);

    let attr = resolver.resolve(&conn, "disposedIn").unwrap();
    assert_eq!(attr.owner_table, "latest_disposition");
    assert_eq!(attr.label, "disposed");
}

#[test]
fn form_selection_resolves_through_satellite_link() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    let attr = resolver.resolve(&conn, "latest_dispositions").unwrap();
    assert_eq!(attr.kind, AttributeKind::MultiReference);
    assert_eq!(attr.owner_table, "description");
    assert_eq!(attr.label, "disposition");
    match &attr.source {
        AttributeSource::Association(link) => assert_eq!(link.table, "latest_disposition"),
        other => panic!("unexpected source: {other:?}"),
    }
}

#[test]
fn project_id_resolves_to_root_scalar() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    let attr = resolver.resolve(&conn, "projectID").unwrap();
    assert_eq!(attr.kind, AttributeKind::Scalar);
    assert_eq!(attr.owner_table, "description");
    assert_eq!(
        attr.source,
        AttributeSource::Column {
            name: "projectID".to_string(),
            ty: ColumnType::Integer
        }
    );
}

#[test]
fn compound_text_key_searches_name_and_abstract() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    let attr = resolver.resolve(&conn, "name_abs").unwrap();
    assert!(attr.is_text());
    assert_eq!(attr.label, "name or abstract");
    assert_eq!(attr.source.text_columns(), vec!["name", "abstract"]);
}

#[test]
fn unknown_and_hidden_keys_are_reported_as_unknown() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    for key in ["nonsense", "username", "fiscalyearDesc"] {
        match resolver.resolve(&conn, key) {
            Err(ResolveError::UnknownAttribute(missing)) => assert_eq!(missing, key),
            other => panic!("{key}: unexpected result {other:?}"),
        }
    }
}

#[test]
fn vocabulary_only_columns_are_not_project_attributes() {
    let conn = common::seeded_store();
    let resolver = common::resolver();

    assert!(matches!(
        resolver.resolve(&conn, "technologyRationale"),
        Err(ResolveError::UnknownAttribute(_))
    ));
}
