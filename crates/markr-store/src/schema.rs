use rusqlite::Connection;

use markr_core::MarkrError;

pub fn init_db(conn: &Connection) -> Result<(), MarkrError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS test_results (
            test_id TEXT NOT NULL,
            student_number TEXT NOT NULL,
            record TEXT NOT NULL, -- JSON StudentRecord
            PRIMARY KEY (test_id, student_number)
        );

        CREATE TABLE IF NOT EXISTS raw_batches (
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            stored_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| MarkrError::Database(e.to_string()))?;

    Ok(())
}
