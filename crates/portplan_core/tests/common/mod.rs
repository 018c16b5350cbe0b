#![allow(dead_code)]

use portplan_core::db::open_db_in_memory;
use portplan_core::{portfolio_resolver, AttributeResolver, ReportConfig};
use rusqlite::Connection;

/// Abstract of project 2: 97 `a`s, a space, then 52 `b`s.
pub fn long_abstract() -> String {
    format!("{} {}", "a".repeat(97), "b".repeat(52))
}

/// In-memory store with three projects.
///
/// | id | name       | maturity   | sponsor | stakeholders      | disposition      |
/// |----|------------|------------|---------|-------------------|------------------|
/// | 1  | Alpha Beta | idea       | Provost | Faculty, Students | approved         |
/// | 2  | Alpha      | pilot      | CIO     | Students          | (no row)         |
/// | 3  | Beta Gamma | production | (null)  | (none)            | row, null value  |
pub fn seeded_store() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO maturitylist (maturityID, maturityDesc) VALUES
            (0, ''), (1, 'idea'), (2, 'pilot'), (3, 'production');
         INSERT INTO sponsorlist (sponsorID, sponsorDesc) VALUES
            (0, ''), (1, 'Provost'), (2, 'CIO');
         INSERT INTO stakeholderlist (stakeholderID, stakeholderDesc) VALUES
            (1, 'Faculty'), (2, 'Students'), (3, 'Staff');
         INSERT INTO driverlist (driverID, driverDesc) VALUES
            (1, 'Research'), (2, 'Teaching');
         INSERT INTO dispositionlist (dispositionID, dispositionDesc) VALUES
            (1, 'approved'), (2, 'deferred');
         INSERT INTO flavorlist (flavorID, flavorDesc) VALUES
            (1, 'core'), (2, 'growth');

         INSERT INTO description (projectID, name, abstract, maturityID, sponsorID, created) VALUES
            (1, 'Alpha Beta', 'Shared research storage', 1, 1, '2017-03-09');
         INSERT INTO description (projectID, name, abstract, maturityID, sponsorID, created) VALUES
            (2, 'Alpha', NULL, 2, 2, NULL);
         INSERT INTO description (projectID, name, abstract, maturityID, sponsorID, created) VALUES
            (3, 'Beta Gamma', NULL, 3, NULL, NULL);

         INSERT INTO stakeholder (projectID, stakeholderID) VALUES (1, 1), (1, 2), (2, 2);
         INSERT INTO driver (projectID, driverID) VALUES (1, 1);

         INSERT INTO latest_disposition (projectID, disposedIn, dispositionID) VALUES
            (1, '2017-04-01', 1), (3, '2017-05-01', NULL);

         INSERT INTO portfolio (projectID, flavorID, rpu) VALUES (1, 1, 2.5), (2, 2, 1.0);",
    )
    .unwrap();
    conn.execute(
        "UPDATE description SET abstract = ?1 WHERE projectID = 2;",
        [long_abstract()],
    )
    .unwrap();
    conn
}

pub fn resolver() -> AttributeResolver {
    portfolio_resolver(&ReportConfig::default()).unwrap()
}

/// Inserts `count` bare projects with IDs starting at `first_id`.
pub fn insert_bare_projects(conn: &Connection, first_id: i64, count: i64) {
    for id in first_id..first_id + count {
        conn.execute(
            "INSERT INTO description (projectID, name) VALUES (?1, ?2);",
            rusqlite::params![id, format!("Project {id}")],
        )
        .unwrap();
    }
}
