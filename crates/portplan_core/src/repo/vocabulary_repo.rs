//! Vocabulary choice loading.
//!
//! # Invariants
//! - Choices come back in the order configured for the attribute.
//! - A `NULL` description is read as the empty string.

use super::RepoResult;
use crate::model::attribute::VocabularyEntry;
use crate::query::plan::ident;
use crate::schema::catalog::VocabularyShape;
use crate::schema::forms::ChoiceOrder;
use rusqlite::Connection;

/// Repository interface for controlled vocabularies.
pub trait VocabularyRepository {
    fn load_choices(
        &self,
        shape: &VocabularyShape,
        order: ChoiceOrder,
    ) -> RepoResult<Vec<VocabularyEntry>>;
}

/// SQLite-backed vocabulary repository.
pub struct SqliteVocabularyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVocabularyRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl VocabularyRepository for SqliteVocabularyRepository<'_> {
    fn load_choices(
        &self,
        shape: &VocabularyShape,
        order: ChoiceOrder,
    ) -> RepoResult<Vec<VocabularyEntry>> {
        let id = ident(&shape.id_column);
        let desc = ident(&shape.desc_column);
        let order_by = match order {
            ChoiceOrder::ById => id.clone(),
            ChoiceOrder::ByDescription => format!("{desc} COLLATE NOCASE ASC, {id} ASC"),
            ChoiceOrder::Natural => "rowid".to_string(),
        };
        let sql = format!(
            "SELECT {id}, {desc} FROM {} ORDER BY {order_by};",
            ident(&shape.table)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let description: Option<String> = row.get(1)?;
            entries.push(VocabularyEntry::new(
                row.get(0)?,
                description.unwrap_or_default(),
            ));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::{SqliteVocabularyRepository, VocabularyRepository};
    use crate::db::open_db_in_memory;
    use crate::schema::catalog::VocabularyShape;
    use crate::schema::forms::ChoiceOrder;

    fn host_shape() -> VocabularyShape {
        VocabularyShape {
            table: "hostlist".to_string(),
            root: "host".to_string(),
            id_column: "hostID".to_string(),
            desc_column: "hostDesc".to_string(),
        }
    }

    #[test]
    fn choices_follow_configured_order() {
        let conn = open_db_in_memory().expect("in-memory store should open");
        conn.execute_batch(
            "INSERT INTO hostlist (hostID, hostDesc) VALUES (3, 'archives');
             INSERT INTO hostlist (hostID, hostDesc) VALUES (1, 'library');
             INSERT INTO hostlist (hostID, hostDesc) VALUES (2, 'Central IT');",
        )
        .expect("seed vocabulary");
        let repo = SqliteVocabularyRepository::new(&conn);

        let by_id = repo
            .load_choices(&host_shape(), ChoiceOrder::ById)
            .expect("load by id")
            .into_iter()
            .map(|entry| entry.id)
            .collect::<Vec<_>>();
        assert_eq!(by_id, vec![1, 2, 3]);

        let by_desc = repo
            .load_choices(&host_shape(), ChoiceOrder::ByDescription)
            .expect("load by description")
            .into_iter()
            .map(|entry| entry.description)
            .collect::<Vec<_>>();
        assert_eq!(by_desc, vec!["archives", "Central IT", "library"]);
    }
}
