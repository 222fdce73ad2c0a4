//! Deterministic assembly of drained fan-out results

use crate::harvest::model::{Course, Subject};
use std::collections::BTreeMap;

/// Deduplicates subjects by code and orders them by code
///
/// When a code appears more than once the later entry wins, so the result
/// depends only on drain order for duplicates and never on it otherwise.
pub fn merge_subjects(subjects: Vec<Subject>) -> Vec<Subject> {
    let mut by_code: BTreeMap<String, Subject> = BTreeMap::new();
    for subject in subjects {
        if let Some(previous) = by_code.insert(subject.code.clone(), subject) {
            tracing::debug!("Duplicate subject {} replaced", previous.code);
        }
    }
    by_code.into_values().collect()
}

/// Builds the code -> name lookup for a list of subjects
pub fn subject_names(subjects: &[Subject]) -> BTreeMap<String, String> {
    subjects
        .iter()
        .map(|s| (s.code.clone(), s.name.clone()))
        .collect()
}

/// Assembles a course from its drained subjects
pub fn merge_course(
    name: impl Into<String>,
    code: impl Into<String>,
    specialization: Option<String>,
    subjects: Vec<Subject>,
) -> Course {
    let subjects = merge_subjects(subjects);
    let subject_names = subject_names(&subjects);

    Course {
        name: name.into(),
        code: code.into(),
        specialization,
        subjects,
        subject_names,
    }
}
