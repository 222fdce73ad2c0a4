//! Storage module for persisting harvest data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Path-addressed JSON documents (catalog, offerings, comments)
//! - Run tracking with unit totals
//! - Publishing a harvested catalog as documents

mod publish;
mod schema;
mod sqlite;
mod traits;

pub use publish::{
    course_document_id, publish_catalog, subject_document_id, PublishReport, COURSES_COLLECTION,
    SUBJECTS_COLLECTION,
};
pub use sqlite::SqliteStorage;
pub use traits::{DocumentStore, Storage, StorageError, StorageResult};

use crate::HarvestError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    Ok(SqliteStorage::new(path)?)
}

/// Derives a stable document id from identifying fields
///
/// The parts are joined with `/` and hashed with SHA-256, so the same
/// identity always maps to the same id regardless of harvest order.
pub fn document_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parts.join("/").as_bytes());
    hex::encode(hasher.finalize())
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub payload: Value,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub totals: RunTotals,
}

/// Unit accounting of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub expected: u64,
    pub collected: u64,
    pub dropped: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
