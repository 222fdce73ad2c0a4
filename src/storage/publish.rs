//! Catalog publishing
//!
//! Writes a harvested catalog into the document store: one `subjects`
//! document per subject and one `courses` document per course. Every write
//! is attempted; a failed write is recorded and the rest continue.

use crate::harvest::{Course, Subject};
use crate::storage::{document_id, DocumentStore};
use serde_json::{json, Value};

pub const SUBJECTS_COLLECTION: &str = "subjects";
pub const COURSES_COLLECTION: &str = "courses";

/// Outcome of publishing a catalog
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub written: usize,

    /// (collection/id, error message) of every failed write
    pub failed: Vec<(String, String)>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<E: std::fmt::Display>(&mut self, collection: &str, id: &str, result: Result<(), E>) {
        match result {
            Ok(()) => self.written += 1,
            Err(e) => {
                tracing::warn!("Failed to write {}/{}: {}", collection, id, e);
                self.failed.push((format!("{}/{}", collection, id), e.to_string()));
            }
        }
    }
}

/// Document id of a subject within a course
pub fn subject_document_id(code: &str, course_code: &str, specialization: Option<&str>) -> String {
    document_id(&[code, course_code, specialization.unwrap_or("")])
}

/// Document id of a course
pub fn course_document_id(course: &Course) -> String {
    document_id(&[&course.code, course.specialization.as_deref().unwrap_or("")])
}

/// Publishes every course and subject to the store
pub fn publish_catalog<S: DocumentStore + ?Sized>(courses: &[Course], store: &mut S) -> PublishReport {
    let mut report = PublishReport::default();

    for course in courses {
        for subject in &course.subjects {
            let id = subject_document_id(
                &subject.code,
                &course.code,
                course.specialization.as_deref(),
            );
            let payload = subject_payload(subject, course);
            let result = store.write(SUBJECTS_COLLECTION, &id, &payload);
            report.record(SUBJECTS_COLLECTION, &id, result);
        }

        let id = course_document_id(course);
        let result = store.write(COURSES_COLLECTION, &id, &course_payload(course));
        report.record(COURSES_COLLECTION, &id, result);
    }

    tracing::info!(
        "Published {} documents ({} failed)",
        report.written,
        report.failed.len()
    );

    report
}

fn subject_payload(subject: &Subject, course: &Course) -> Value {
    json!({
        "code": subject.code,
        "name": subject.name,
        "description": subject.description,
        "class_credits": subject.class_credits,
        "assign_credits": subject.assign_credits,
        "total_hours": subject.total_hours,
        "requirements": subject.requirements,
        "course_code": course.code,
        "specialization": course.specialization,
        "stats": { "worth_it": 0, "total": 0 },
    })
}

fn course_payload(course: &Course) -> Value {
    json!({
        "name": course.name,
        "code": course.code,
        "specialization": course.specialization,
        "subjects": course.subject_names,
    })
}
