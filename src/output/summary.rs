//! Harvest summary types
//!
//! A summary is built from a finished harvest and, when the harvest was
//! persisted, enriched with its run record and publish outcome.

use crate::harvest::{CourseHarvest, FailureKind, FieldWarning, InstituteHarvest, UnitFailure};
use crate::storage::{PublishReport, RunRecord};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("No harvest runs found in database")]
    NoRuns,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Per-course unit accounting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub name: String,
    pub code: String,
    pub specialization: Option<String>,
    pub expected: usize,
    pub collected: usize,
    pub dropped: usize,
    pub cancelled: usize,
    pub duplicates: usize,
}

impl From<&CourseHarvest> for CourseSummary {
    fn from(harvest: &CourseHarvest) -> Self {
        Self {
            name: harvest.course.name.clone(),
            code: harvest.course.code.clone(),
            specialization: harvest.course.specialization.clone(),
            expected: harvest.expected,
            collected: harvest.collected(),
            dropped: harvest.dropped_count(),
            cancelled: harvest.cancelled,
            duplicates: harvest.duplicates,
        }
    }
}

/// Summary of one harvest
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    // Run metadata, present once the harvest was persisted
    pub run_id: Option<i64>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: Option<String>,

    pub courses: Vec<CourseSummary>,
    pub failed_courses: Vec<UnitFailure>,

    /// Every dropped unit, course-level failures included
    pub failures_by_kind: BTreeMap<FailureKind, usize>,

    /// Dropped subject units with their course name
    pub dropped_units: Vec<(String, UnitFailure)>,

    pub warnings: Vec<FieldWarning>,

    // Publish outcome
    pub documents_written: usize,
    pub documents_failed: usize,
}

impl HarvestSummary {
    /// Builds a summary from a finished harvest
    pub fn from_harvest(harvest: &InstituteHarvest) -> Self {
        let mut summary = Self {
            status: "harvested".to_string(),
            courses: harvest.courses.iter().map(CourseSummary::from).collect(),
            failed_courses: harvest.failed_courses.clone(),
            ..Self::default()
        };

        for course in &harvest.courses {
            for failure in &course.dropped {
                *summary.failures_by_kind.entry(failure.kind).or_insert(0) += 1;
                summary
                    .dropped_units
                    .push((course.course.name.clone(), failure.clone()));
            }
            summary.warnings.extend(course.warnings.iter().cloned());
        }

        for failure in &harvest.failed_courses {
            *summary.failures_by_kind.entry(failure.kind).or_insert(0) += 1;
        }

        summary
    }

    /// Attaches the run record of a persisted harvest
    pub fn with_run(mut self, run: &RunRecord) -> Self {
        self.duration_seconds = duration_seconds(&run.started_at, run.finished_at.as_deref());
        self.run_id = Some(run.id);
        self.started_at = Some(run.started_at.clone());
        self.finished_at = run.finished_at.clone();
        self.status = run.status.to_db_string().to_string();
        self.config_hash = Some(run.config_hash.clone());
        self
    }

    /// Attaches the outcome of publishing the catalog
    pub fn with_publish(mut self, report: &PublishReport) -> Self {
        self.documents_written = report.written;
        self.documents_failed = report.failed.len();
        self
    }

    pub fn expected(&self) -> usize {
        self.courses.iter().map(|c| c.expected).sum()
    }

    pub fn collected(&self) -> usize {
        self.courses.iter().map(|c| c.collected).sum()
    }

    pub fn dropped(&self) -> usize {
        self.courses.iter().map(|c| c.dropped).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.courses.iter().map(|c| c.duplicates).sum()
    }

    /// Percentage of distinct expected subjects that were collected
    pub fn completeness(&self) -> f64 {
        let expected = self.expected().saturating_sub(self.duplicates());
        if expected == 0 {
            return 0.0;
        }
        (self.collected() as f64 / expected as f64) * 100.0
    }
}

fn duration_seconds(started: &str, finished: Option<&str>) -> Option<u64> {
    let started = started.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = finished?.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    u64::try_from((finished - started).num_seconds()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::{merge_course, Subject};
    use crate::storage::{RunStatus, RunTotals};

    fn sample_harvest() -> InstituteHarvest {
        let subject = |code: &str| Subject {
            code: code.to_string(),
            name: format!("Subject {}", code),
            ..Subject::default()
        };

        InstituteHarvest {
            courses: vec![CourseHarvest {
                course: merge_course(
                    "BCC",
                    "55041",
                    None,
                    vec![subject("SMA0356"), subject("SCC0230")],
                ),
                expected: 3,
                dropped: vec![UnitFailure::new("BAD000", FailureKind::NotFound, "404")],
                cancelled: 0,
                duplicates: 0,
                warnings: vec![FieldWarning {
                    code: "SCC0230".to_string(),
                    field: "description",
                    message: "missing field: Objetivos".to_string(),
                }],
            }],
            failed_courses: vec![UnitFailure::new("BSI", FailureKind::Timeout, "timed out")],
        }
    }

    #[test]
    fn test_summary_from_harvest() {
        let summary = HarvestSummary::from_harvest(&sample_harvest());

        assert_eq!(summary.expected(), 3);
        assert_eq!(summary.collected(), 2);
        assert_eq!(summary.dropped(), 1);
        assert_eq!(summary.failures_by_kind.get(&FailureKind::NotFound), Some(&1));
        assert_eq!(summary.failures_by_kind.get(&FailureKind::Timeout), Some(&1));
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.dropped_units[0].0, "BCC");
        assert!((summary.completeness() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_duplicate_links_do_not_lower_completeness() {
        let mut harvest = sample_harvest();
        harvest.courses[0].expected = 4;
        harvest.courses[0].duplicates = 1;
        assert!(harvest.courses[0].is_accounted());

        let summary = HarvestSummary::from_harvest(&harvest);

        assert_eq!(summary.expected(), 4);
        assert_eq!(summary.duplicates(), 1);
        assert_eq!(summary.courses[0].duplicates, 1);
        assert!((summary.completeness() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_summary_with_run() {
        let run = RunRecord {
            id: 7,
            started_at: "2024-03-01T10:00:00+00:00".to_string(),
            finished_at: Some("2024-03-01T10:02:00+00:00".to_string()),
            config_hash: "abc".to_string(),
            status: RunStatus::Completed,
            totals: RunTotals::default(),
        };

        let summary = HarvestSummary::from_harvest(&sample_harvest()).with_run(&run);
        assert_eq!(summary.run_id, Some(7));
        assert_eq!(summary.duration_seconds, Some(120));
        assert_eq!(summary.status, "completed");
    }

    #[test]
    fn test_empty_harvest_completeness() {
        let summary = HarvestSummary::from_harvest(&InstituteHarvest::default());
        assert_eq!(summary.completeness(), 0.0);
    }
}
