//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of harvest
//! results: run metadata, per-course unit accounting, failures, and field
//! warnings.

use crate::output::summary::{HarvestSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Cap on listed warnings and dropped units
const MAX_LISTED: usize = 50;

/// Writes a markdown summary to a file
///
/// # Arguments
///
/// * `summary` - The harvest summary
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &HarvestSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a harvest summary as markdown
pub fn format_markdown_summary(summary: &HarvestSummary) -> String {
    let mut md = String::new();

    md.push_str("# Catalog Harvest Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(run_id) = summary.run_id {
        md.push_str(&format!("- **Run ID**: {}\n", run_id));
    }
    if let Some(started) = &summary.started_at {
        md.push_str(&format!("- **Started**: {}\n", started));
    }
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Courses**: {}\n", summary.courses.len()));
    md.push_str(&format!(
        "- **Failed Courses**: {}\n",
        summary.failed_courses.len()
    ));
    md.push_str(&format!("- **Expected Subjects**: {}\n", summary.expected()));
    md.push_str(&format!("- **Collected Subjects**: {}\n", summary.collected()));
    md.push_str(&format!("- **Dropped Subjects**: {}\n", summary.dropped()));
    md.push_str(&format!("- **Duplicate Links**: {}\n", summary.duplicates()));
    md.push_str(&format!(
        "- **Completeness**: {:.2}%\n",
        summary.completeness()
    ));
    md.push_str(&format!("- **Field Warnings**: {}\n", summary.warnings.len()));
    md.push_str(&format!(
        "- **Documents Written**: {} ({} failed)\n\n",
        summary.documents_written, summary.documents_failed
    ));

    // Per-course accounting
    if !summary.courses.is_empty() {
        md.push_str("## Courses\n\n");
        md.push_str("| Course | Code | Expected | Collected | Dropped | Cancelled | Duplicates |\n");
        md.push_str("|--------|------|----------|-----------|---------|-----------|------------|\n");

        for course in &summary.courses {
            let code = match &course.specialization {
                Some(spec) => format!("{}/{}", course.code, spec),
                None => course.code.clone(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                course.name,
                code,
                course.expected,
                course.collected,
                course.dropped,
                course.cancelled,
                course.duplicates
            ));
        }
        md.push('\n');
    }

    // Failures by kind
    if !summary.failures_by_kind.is_empty() {
        md.push_str("## Failure Summary\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");

        for (kind, count) in &summary.failures_by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !summary.failed_courses.is_empty() {
        md.push_str("## Failed Courses\n\n");
        for failure in &summary.failed_courses {
            md.push_str(&format!("- {}\n", failure));
        }
        md.push('\n');
    }

    if !summary.dropped_units.is_empty() {
        md.push_str("## Dropped Subjects\n\n");
        for (course, failure) in summary.dropped_units.iter().take(MAX_LISTED) {
            md.push_str(&format!("- {}: {}\n", course, failure));
        }
        push_overflow(&mut md, summary.dropped_units.len());
    }

    if !summary.warnings.is_empty() {
        md.push_str("## Field Warnings\n\n");
        for warning in summary.warnings.iter().take(MAX_LISTED) {
            md.push_str(&format!("- {}\n", warning));
        }
        push_overflow(&mut md, summary.warnings.len());
    }

    md
}

fn push_overflow(md: &mut String, total: usize) {
    if total > MAX_LISTED {
        md.push_str(&format!("\n... and {} more\n\n", total - MAX_LISTED));
    } else {
        md.push('\n');
    }
}
