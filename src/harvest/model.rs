use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A catalog subject (example: SMA0356 - Cálculo IV)
///
/// A `Subject` only exists once its page was fetched and its identity
/// extracted; missing description or stats are the zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    pub name: String,
    pub description: String,
    pub class_credits: u32,
    pub assign_credits: u32,
    pub total_hours: String,
    pub requirements: Vec<String>,
}

/// A course/major (example: BCC) with its subjects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,

    /// Course code (`codcur`), or the course name when the link has none
    pub code: String,

    /// Specialization (`codhab`), if the course has one
    pub specialization: Option<String>,

    /// Subjects ordered by code
    pub subjects: Vec<Subject>,

    /// Lookup from subject code to subject name
    pub subject_names: BTreeMap<String, String>,
}
