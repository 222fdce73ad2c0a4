//! Catalog harvesting
//!
//! This module contains the harvesting pipeline:
//! - Fetcher: one HTTP request per call, typed failures, cancellable
//! - Extractors: pure field extraction over parsed pages
//! - Coordinator: bounded fan-out with a fan-in barrier
//! - Unit scraper and merge: one subject per unit, deterministic assembly
//! - Harvester: institute, course, and department entry points

mod coordinator;
mod extract;
mod fetcher;
mod institute;
mod merge;
mod model;
mod professors;
mod unit;

pub use coordinator::{fan_out, FailureKind, FanOutLimits, FanOutReport, UnitFailure, UnitLabel};
pub use extract::{
    collapse_whitespace, extract_course_links, extract_description, extract_names,
    extract_professors, extract_requirements, extract_stats, extract_subject_links,
    has_not_found_marker, ExtractError, ListingLink, SubjectStats,
};
pub use fetcher::{build_http_client, FetchError, Fetcher, Page};
pub use institute::{CourseHarvest, Harvester, InstituteHarvest};
pub use merge::{merge_course, merge_subjects, subject_names};
pub use model::{Course, Subject};
pub use professors::DepartmentListing;
pub use unit::{fetch_with_retry, FieldWarning, ScrapedSubject, SubjectScraper};
