//! Offering aggregation
//!
//! Each offering document of a subject is one unit: its comments are read
//! and their ratings counted in a task of its own. Once every task has
//! finished, the views are ranked and truncated to the requested limit.
//!
//! Store reads are blocking and run on tokio's blocking pool. The store sits
//! behind one mutex, so reads are serialized; the fan-out still gives each
//! offering its own failure accounting.

use crate::harvest::{fan_out, FailureKind, FanOutLimits, UnitFailure, UnitLabel};
use crate::offerings::model::{rank_offerings, Offering, OfferingStats, OfferingView};
use crate::storage::{subject_document_id, Document, DocumentStore, StorageError, SUBJECTS_COLLECTION};
use crate::HarvestError;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Identity of a subject within a course
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKey {
    pub code: String,
    pub course_code: String,
    pub specialization: Option<String>,
}

impl SubjectKey {
    pub fn new(
        code: impl Into<String>,
        course_code: impl Into<String>,
        specialization: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            course_code: course_code.into(),
            specialization,
        }
    }

    pub fn document_id(&self) -> String {
        subject_document_id(&self.code, &self.course_code, self.specialization.as_deref())
    }

    /// Collection holding this subject's offerings
    pub fn offerings_collection(&self) -> String {
        format!("{}/{}/offerings", SUBJECTS_COLLECTION, self.document_id())
    }
}

impl UnitLabel for Document {
    fn unit_label(&self) -> String {
        self.id.clone()
    }
}

/// Ranked offerings of a subject
#[derive(Debug, Clone)]
pub struct OfferingsReport {
    /// Ranked views, truncated to the limit
    pub offerings: Vec<OfferingView>,

    /// Offering documents found
    pub total: usize,

    /// Offerings that could not be aggregated
    pub dropped: Vec<UnitFailure>,
}

/// Aggregates and ranks the offerings of a subject
///
/// # Arguments
///
/// * `store` - Shared document store
/// * `key` - The subject whose offerings are aggregated
/// * `limit` - Maximum number of offerings returned; `None` or 0 returns all
/// * `limits` - Fan-out concurrency cap
/// * `cancel` - Cancellation token for the fan-out
///
/// # Returns
///
/// * `Ok(OfferingsReport)` - Ranked offerings, plus any dropped ones
/// * `Err(HarvestError::NotFound)` - The subject has no offerings
/// * `Err(HarvestError::Storage)` - The offerings could not be listed
pub async fn aggregate_offerings<S>(
    store: Arc<Mutex<S>>,
    key: &SubjectKey,
    limit: Option<usize>,
    limits: FanOutLimits,
    cancel: &CancellationToken,
) -> Result<OfferingsReport, HarvestError>
where
    S: DocumentStore + Send + 'static,
{
    let collection = key.offerings_collection();
    let documents = {
        let guard = store.lock().map_err(|_| StorageError::Poisoned)?;
        guard.list(&collection)?
    };

    if documents.is_empty() {
        return Err(HarvestError::NotFound(format!(
            "no offerings for {} in course {}",
            key.code, key.course_code
        )));
    }

    let total = documents.len();
    tracing::debug!("Aggregating {} offerings of {}", total, key.code);

    let report = fan_out(documents, limits, cancel, move |document, _| {
        let store = Arc::clone(&store);
        let collection = collection.clone();
        async move {
            let id = document.id.clone();
            tokio::task::spawn_blocking(move || aggregate_one(&store, &collection, document))
                .await
                .unwrap_or_else(|e| Err(UnitFailure::new(id, FailureKind::Panicked, e.to_string())))
        }
    })
    .await;

    let mut offerings = report.collected;
    rank_offerings(&mut offerings);

    if let Some(limit) = limit.filter(|&l| l > 0) {
        offerings.truncate(limit);
    }

    Ok(OfferingsReport {
        offerings,
        total,
        dropped: report.dropped,
    })
}

fn aggregate_one<S: DocumentStore>(
    store: &Mutex<S>,
    collection: &str,
    document: Document,
) -> Result<OfferingView, UnitFailure> {
    let offering: Offering = serde_json::from_value(document.payload)
        .map_err(|e| UnitFailure::new(&document.id, FailureKind::Parse, e.to_string()))?;

    let comments_collection = format!("{}/{}/comments", collection, document.id);
    let comments = store
        .lock()
        .map_err(|_| UnitFailure::new(&document.id, FailureKind::Storage, "storage lock poisoned"))?
        .list(&comments_collection)
        .map_err(|e| UnitFailure::new(&document.id, FailureKind::Storage, e.to_string()))?;

    let mut stats = OfferingStats::default();
    for comment in &comments {
        let rating = comment.payload.get("rating").and_then(|r| r.as_i64()).ok_or_else(|| {
            UnitFailure::new(
                &document.id,
                FailureKind::Parse,
                format!("comment {} has no integer rating", comment.id),
            )
        })?;
        stats.record(rating);
    }

    Ok(OfferingView::new(document.id, offering, stats))
}
