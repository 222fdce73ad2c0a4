//! Storage traits and error types
//!
//! Two seams: [`DocumentStore`] is the path-addressed document collaborator
//! used by publishing and offering aggregation; [`Storage`] adds run
//! tracking for the harvest binary.

use crate::storage::{Document, RunRecord, RunStatus, RunTotals};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Path-addressed document store
///
/// Collections are slash-separated paths (`subjects`,
/// `subjects/<id>/offerings`). Writing an existing id replaces it.
pub trait DocumentStore {
    /// Inserts or replaces a document
    fn write(&mut self, collection: &str, id: &str, payload: &Value) -> StorageResult<()>;

    /// Reads one document, `None` if it does not exist
    fn read(&self, collection: &str, id: &str) -> StorageResult<Option<Document>>;

    /// Lists every document of a collection, ordered by id
    fn list(&self, collection: &str) -> StorageResult<Vec<Document>>;

    /// Counts the documents of a collection
    fn count(&self, collection: &str) -> StorageResult<u64> {
        Ok(self.list(collection)?.len() as u64)
    }
}

/// Document store with harvest run tracking
pub trait Storage: DocumentStore {
    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Finishes a run with its final status and unit totals
    fn complete_run(&mut self, run_id: i64, status: RunStatus, totals: RunTotals)
        -> StorageResult<()>;
}
