mod common;

use portplan_core::{Bucket, ReportConfig, ReportService, ReportServiceError};
use std::collections::BTreeSet;

fn buckets(key: &str) -> Vec<Bucket> {
    let conn = common::seeded_store();
    let resolver = common::resolver();
    let config = ReportConfig::default();
    ReportService::new(&conn, &resolver, &config)
        .breakdown(key)
        .unwrap()
}

fn summary(buckets: &[Bucket]) -> Vec<(&str, Vec<i64>)> {
    buckets
        .iter()
        .map(|bucket| (bucket.description.as_str(), bucket.project_ids.clone()))
        .collect()
}

#[test]
fn multi_reference_breakdown_starts_with_null_bucket() {
    let buckets = buckets("stakeholders");
    assert_eq!(
        summary(&buckets),
        vec![
            ("no stakeholders", vec![3]),
            ("Faculty", vec![1]),
            ("Staff", vec![]),
            ("Students", vec![1, 2]),
        ]
    );
    assert_eq!(buckets[0].query_string, "stakeholders=");
    assert_eq!(buckets[0].query_desc, "no stakeholders");
    assert_eq!(buckets[3].query_string, "stakeholders=2");
    assert_eq!(buckets[3].query_desc, "stakeholders include 'Students'");
}

#[test]
fn single_reference_buckets_partition_the_projects() {
    let buckets = buckets("maturity");
    assert_eq!(
        summary(&buckets),
        vec![
            ("none", vec![]),
            ("idea", vec![1]),
            ("pilot", vec![2]),
            ("production", vec![3]),
        ]
    );
    assert_eq!(buckets[1].query_string, "maturity=1");
    assert_eq!(buckets[1].query_desc, "maturity='idea'");

    let mut seen = BTreeSet::new();
    for bucket in &buckets {
        for id in &bucket.project_ids {
            assert!(seen.insert(*id), "project {id} appears in two buckets");
        }
    }
    assert_eq!(seen, BTreeSet::from([1, 2, 3]));
}

#[test]
fn null_bucket_counts_missing_and_empty_satellite_rows() {
    let buckets = buckets("latest_dispositions");
    assert_eq!(
        summary(&buckets),
        vec![("no disposition", vec![2, 3]), ("approved", vec![1]), ("deferred", vec![])]
    );
    assert_eq!(buckets[0].query_desc, "no disposition");
}

#[test]
fn multi_reference_buckets_cover_every_project() {
    let covered = buckets("stakeholders")
        .into_iter()
        .flat_map(|bucket| bucket.project_ids)
        .collect::<BTreeSet<_>>();
    assert_eq!(covered, BTreeSet::from([1, 2, 3]));
}

#[test]
fn satellite_reference_breakdown_reads_through_the_join() {
    assert_eq!(
        summary(&buckets("flavor")),
        vec![("core", vec![1]), ("growth", vec![2])]
    );
}

#[test]
fn bucket_query_string_reproduces_the_bucket() {
    let conn = common::seeded_store();
    let resolver = common::resolver();
    let config = ReportConfig::default();
    let service = ReportService::new(&conn, &resolver, &config);

    for bucket in service.breakdown("stakeholders").unwrap() {
        let report = service.report(&bucket.query_string, &[]).unwrap();
        assert_eq!(report.project_list, bucket.project_ids);
        assert_eq!(report.query_desc, bucket.query_desc);
    }
}

#[test]
fn unknown_breakdown_key_is_a_caller_error() {
    let conn = common::seeded_store();
    let resolver = common::resolver();
    let config = ReportConfig::default();

    match ReportService::new(&conn, &resolver, &config).breakdown("nonsense") {
        Err(ReportServiceError::UnknownAttribute(key)) => assert_eq!(key, "nonsense"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn breakdown_choices_are_sorted_by_label() {
    let conn = common::seeded_store();
    let resolver = common::resolver();
    let config = ReportConfig::default();

    let labels = ReportService::new(&conn, &resolver, &config)
        .breakdown_choices()
        .into_iter()
        .map(|choice| choice.desc)
        .collect::<Vec<_>>();
    let mut sorted = labels.clone();
    sorted.sort();
    assert_eq!(labels, sorted);
    assert!(labels.iter().any(|label| label == "stakeholders"));
}

#[test]
fn null_bucket_is_distinct_from_an_empty_vocabulary_entry() {
    let conn = common::seeded_store();
    conn.execute(
        "INSERT INTO stakeholderlist (stakeholderID, stakeholderDesc) VALUES (9, '');",
        [],
    )
    .unwrap();
    let resolver = common::resolver();
    let config = ReportConfig::default();

    let buckets = ReportService::new(&conn, &resolver, &config)
        .breakdown("stakeholders")
        .unwrap();
    assert_eq!(
        summary(&buckets),
        vec![
            ("no stakeholders", vec![3]),
            ("none", vec![]),
            ("Faculty", vec![1]),
            ("Staff", vec![]),
            ("Students", vec![1, 2]),
        ]
    );
    assert_eq!(buckets[1].query_string, "stakeholders=9");
}
