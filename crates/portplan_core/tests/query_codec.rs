mod common;

use portplan_core::{decode, ReportConfig, ReportService};

fn round_trip(query: &str) -> (Vec<i64>, String, String) {
    let conn = common::seeded_store();
    let resolver = common::resolver();
    let config = ReportConfig::default();
    let report = ReportService::new(&conn, &resolver, &config)
        .report(query, &["name".to_string()])
        .unwrap();
    (report.project_list, report.query_string, report.query_desc)
}

#[test]
fn null_flag_combines_with_ids() {
    let (ids, query, desc) = round_trip("sponsor=&sponsor=1");
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(query, "sponsor=1&sponsor=");
    assert_eq!(desc, "sponsor='Provost' or no sponsor");
}

#[test]
fn canonical_query_string_is_stable() {
    let (ids, query, desc) = round_trip("stakeholders=2&stakeholders=1&name=Alpha&nameLogic=phrase");
    let (again_ids, again_query, again_desc) = round_trip(&query);
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(again_ids, ids);
    assert_eq!(again_query, query);
    assert_eq!(again_desc, desc);
    assert_eq!(query, "stakeholders=1&stakeholders=2&name=Alpha&nameLogic=phrase");
    assert_eq!(
        desc,
        "stakeholders include 'Faculty' or 'Students', and name contains 'Alpha'"
    );
}

#[test]
fn unknown_ids_and_empty_values_leave_no_filter() {
    let (ids, query, desc) = round_trip("maturity=99&rpu=&name=");
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(query, "");
    assert_eq!(desc, "none");
}

#[test]
fn scalar_equality_binds_typed_values() {
    let (ids, query, desc) = round_trip("rpu=2.5");
    assert_eq!(ids, vec![1]);
    assert_eq!(query, "rpu=2.5");
    assert_eq!(desc, "effort=2.5");
}

#[test]
fn decode_keeps_percent_encoded_text() {
    assert_eq!(
        decode("name_abs=open%20access&name_absLogic=phrase"),
        vec![
            ("name_abs".to_string(), vec!["open access".to_string()]),
            ("name_absLogic".to_string(), vec!["phrase".to_string()]),
        ]
    );
}

#[test]
fn unparsable_scalar_value_is_dropped_from_query_and_description() {
    let (ids, query, desc) = round_trip("rpu=abc");
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(query, "");
    assert_eq!(desc, "none");

    let (ids, query, desc) = round_trip("rpu=abc&sponsor=2");
    assert_eq!(ids, vec![2]);
    assert_eq!(query, "sponsor=2");
    assert_eq!(desc, "sponsor='CIO'");
}
