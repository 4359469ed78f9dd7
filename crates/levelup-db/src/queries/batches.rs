use anyhow::Result;

use crate::Database;
use crate::models::BatchRow;
use crate::queries::OptionalExt;

impl Database {
    pub fn insert_batch(
        &self,
        month: &str,
        week: &str,
        name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO batches (month, week, name, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![month, week, name, start_date, end_date],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_batches(&self) -> Result<Vec<BatchRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, month, week, name, start_date, end_date, created_at
                 FROM batches
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], map_batch)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_batch(&self, id: i64) -> Result<Option<BatchRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, month, week, name, start_date, end_date, created_at
                 FROM batches WHERE id = ?1",
            )?;
            let row = stmt.query_row(rusqlite::params![id], map_batch).optional()?;
            Ok(row)
        })
    }

    pub fn update_batch(
        &self,
        id: i64,
        month: &str,
        week: &str,
        name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE batches SET month = ?1, week = ?2, name = ?3, start_date = ?4, end_date = ?5
                 WHERE id = ?6",
                rusqlite::params![month, week, name, start_date, end_date, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_batch(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM batches WHERE id = ?1", rusqlite::params![id])?;
            Ok(changed > 0)
        })
    }
}

fn map_batch(row: &rusqlite::Row<'_>) -> std::result::Result<BatchRow, rusqlite::Error> {
    Ok(BatchRow {
        id: row.get(0)?,
        month: row.get(1)?,
        week: row.get(2)?,
        name: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_crud_round_trip() {
        let db = Database::open_in_memory().unwrap();

        let id = db.insert_batch("August", "W2", "Cohort A", "2026-08-10", "2026-08-16").unwrap();
        assert!(db.get_batch(id).unwrap().is_some());

        assert!(db.update_batch(id, "August", "W3", "Cohort A", "2026-08-17", "2026-08-23").unwrap());
        let batch = db.get_batch(id).unwrap().unwrap();
        assert_eq!(batch.week, "W3");
        assert_eq!(batch.start_date, "2026-08-17");

        assert!(db.delete_batch(id).unwrap());
        assert!(db.get_batch(id).unwrap().is_none());
        assert!(!db.delete_batch(id).unwrap());
    }
}
