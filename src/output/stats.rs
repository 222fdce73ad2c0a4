//! Statistics from the harvest database
//!
//! This module loads and displays catalog statistics from the storage
//! layer: the latest run and the number of published documents.

use crate::output::summary::OutputResult;
use crate::storage::{RunRecord, Storage, COURSES_COLLECTION, SUBJECTS_COLLECTION};

/// Catalog statistics summary
#[derive(Debug, Clone)]
pub struct CatalogStatistics {
    /// Most recent harvest run, if any
    pub latest_run: Option<RunRecord>,

    /// Published subject documents
    pub subjects: u64,

    /// Published course documents
    pub courses: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CatalogStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query statistics
pub fn load_statistics<S: Storage + ?Sized>(storage: &S) -> OutputResult<CatalogStatistics> {
    Ok(CatalogStatistics {
        latest_run: storage.get_latest_run()?,
        subjects: storage.count(SUBJECTS_COLLECTION)?,
        courses: storage.count(COURSES_COLLECTION)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CatalogStatistics) {
    println!("=== Catalog Statistics ===\n");

    println!("Catalog:");
    println!("  Courses: {}", stats.courses);
    println!("  Subjects: {}", stats.subjects);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }

            let totals = run.totals;
            let completeness = if totals.expected > 0 {
                (totals.collected as f64 / totals.expected as f64) * 100.0
            } else {
                0.0
            };
            println!(
                "  Subjects: {} / {} collected ({:.1}%), {} dropped",
                totals.collected, totals.expected, completeness, totals.dropped
            );
        }
        None => println!("No harvest runs recorded"),
    }
}
