//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, Storage, StorageError, StorageResult};
use crate::storage::{Document, RunRecord, RunStatus, RunTotals};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
                           expected_units, collected_units, dropped_units";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        totals: RunTotals {
            expected: row.get::<_, i64>(5)? as u64,
            collected: row.get::<_, i64>(6)? as u64,
            dropped: row.get::<_, i64>(7)? as u64,
        },
    })
}

fn parse_payload(id: String, raw: &str) -> StorageResult<Document> {
    Ok(Document {
        id,
        payload: serde_json::from_str(raw)?,
    })
}

impl DocumentStore for SqliteStorage {
    fn write(&mut self, collection: &str, id: &str, payload: &Value) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO documents (collection, doc_id, payload, written_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, doc_id) DO UPDATE SET
                payload = excluded.payload,
                written_at = excluded.written_at",
            params![collection, id, serde_json::to_string(payload)?, now],
        )?;
        Ok(())
    }

    fn read(&self, collection: &str, id: &str) -> StorageResult<Option<Document>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|raw| parse_payload(id.to_string(), &raw))
            .transpose()
    }

    fn list(&self, collection: &str) -> StorageResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT doc_id, payload FROM documents WHERE collection = ?1 ORDER BY doc_id",
        )?;

        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw)| parse_payload(id, &raw))
            .collect()
    }

    fn count(&self, collection: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: RunTotals,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2,
                expected_units = ?3, collected_units = ?4, dropped_units = ?5
             WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                totals.expected as i64,
                totals.collected as i64,
                totals.dropped as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}
