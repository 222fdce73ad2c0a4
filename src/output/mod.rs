//! Output module for harvest summaries and reports
//!
//! This module handles:
//! - Building summaries of harvest results
//! - Rendering summaries as markdown
//! - Loading catalog statistics from the database

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, CatalogStatistics};
pub use summary::{CourseSummary, HarvestSummary, OutputError, OutputResult};

/// Prints a short harvest report to stdout
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    if let Some(run_id) = summary.run_id {
        println!("Run: {} ({})", run_id, summary.status);
    }
    println!("Courses: {} ({} failed)", summary.courses.len(), summary.failed_courses.len());
    println!(
        "Subjects: {} / {} collected ({:.1}%), {} dropped, {} duplicate links",
        summary.collected(),
        summary.expected(),
        summary.completeness(),
        summary.dropped(),
        summary.duplicates()
    );
    println!("Field warnings: {}", summary.warnings.len());

    if !summary.failures_by_kind.is_empty() {
        println!("\nFailures:");
        for (kind, count) in &summary.failures_by_kind {
            println!("  {}: {}", kind, count);
        }
    }

    if summary.documents_written > 0 || summary.documents_failed > 0 {
        println!(
            "\nDocuments written: {} ({} failed)",
            summary.documents_written, summary.documents_failed
        );
    }
}
