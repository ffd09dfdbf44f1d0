use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use markr_core::{MarkrError, MarkrResult, MergedBatch, ResultStore, StudentRecord};

use crate::schema::init_db;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> MarkrResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MarkrError::Database(format!("cannot create db directory: {e}")))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| MarkrError::Database(format!("cannot open database: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| MarkrError::Database(e.to_string()))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> MarkrResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MarkrError::Database(format!("cannot open in-memory db: {e}")))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Every test id with stored records and its student count.
    pub fn list_tests(&self) -> MarkrResult<Vec<(String, usize)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT test_id, COUNT(*) FROM test_results
                 GROUP BY test_id ORDER BY test_id",
            )
            .map_err(|e| MarkrError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .map_err(|e| MarkrError::Database(e.to_string()))?;

        let tests = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MarkrError::Database(e.to_string()))?;
        Ok(tests)
    }

    /// The verbatim document stored under `key`, if any.
    pub fn get_raw(&self, key: &str) -> MarkrResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT payload FROM raw_batches WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| MarkrError::Database(e.to_string()))
    }
}

impl ResultStore for SqliteStore {
    fn get_results(&self, test_id: &str) -> MarkrResult<BTreeMap<String, StudentRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT student_number, record FROM test_results WHERE test_id = ?1")
            .map_err(|e| MarkrError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![test_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| MarkrError::Database(e.to_string()))?;

        let mut records = BTreeMap::new();
        for row in rows {
            let (student_number, json) = row.map_err(|e| MarkrError::Database(e.to_string()))?;
            let record: StudentRecord = serde_json::from_str(&json)
                .map_err(|e| MarkrError::Corrupt(format!("{test_id}/{student_number}: {e}")))?;
            records.insert(student_number, record);
        }
        Ok(records)
    }

    fn put_results(
        &self,
        test_id: &str,
        records: &BTreeMap<String, StudentRecord>,
    ) -> MarkrResult<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| MarkrError::Database(e.to_string()))?;
        replace_results(&tx, test_id, records)?;
        tx.commit()
            .map_err(|e| MarkrError::Database(e.to_string()))?;
        debug!("stored {} record(s) for test {test_id}", records.len());
        Ok(())
    }

    fn put_raw(&self, key: &str, payload: &str) -> MarkrResult<()> {
        insert_raw(&self.conn, key, payload)
    }

    fn put_import(&self, payload: &str, batches: &[MergedBatch]) -> MarkrResult<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| MarkrError::Database(e.to_string()))?;
        for batch in batches {
            insert_raw(&tx, &batch.raw_key, payload)?;
            replace_results(&tx, &batch.test_id, &batch.records)?;
        }
        tx.commit()
            .map_err(|e| MarkrError::Database(e.to_string()))?;
        debug!("stored import of {} test(s)", batches.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Write helpers (run inside the caller's transaction)
// ---------------------------------------------------------------------------

fn replace_results(
    conn: &Connection,
    test_id: &str,
    records: &BTreeMap<String, StudentRecord>,
) -> MarkrResult<()> {
    conn.execute(
        "DELETE FROM test_results WHERE test_id = ?1",
        params![test_id],
    )
    .map_err(|e| MarkrError::Database(e.to_string()))?;

    let mut stmt = conn
        .prepare(
            "INSERT INTO test_results (test_id, student_number, record)
             VALUES (?1, ?2, ?3)",
        )
        .map_err(|e| MarkrError::Database(e.to_string()))?;
    for (student_number, record) in records {
        let json = serde_json::to_string(record)?;
        stmt.execute(params![test_id, student_number, json])
            .map_err(|e| MarkrError::Database(e.to_string()))?;
    }
    Ok(())
}

fn insert_raw(conn: &Connection, key: &str, payload: &str) -> MarkrResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO raw_batches (key, payload, stored_at)
         VALUES (?1, ?2, ?3)",
        params![key, payload, Utc::now().to_rfc3339()],
    )
    .map_err(|e| MarkrError::Database(e.to_string()))?;
    Ok(())
}
