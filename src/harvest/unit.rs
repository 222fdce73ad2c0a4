//! Unit scraper - one subject from fetch to entity
//!
//! A subject unit is processed as:
//!
//! 1. Fetch the subject page (failure drops the unit)
//! 2. Extract code and name (failure drops the unit as fatal)
//! 3. Extract description, stats independently (failures become warnings)
//! 4. Fetch the requirements page and extract prerequisite codes (failures
//!    become warnings)
//!
//! Everything recoverable degrades the entity rather than dropping it.

use crate::config::RetryPolicy;
use crate::harvest::coordinator::{FailureKind, UnitFailure};
use crate::harvest::extract::{
    extract_description, extract_names, extract_requirements, extract_stats, ExtractError,
    SubjectStats,
};
use crate::harvest::fetcher::{FetchError, Fetcher, Page};
use crate::harvest::model::Subject;
use crate::url::{requirements_url, FetchUnit};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// A field that could not be extracted; the entity survives without it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    /// Code of the subject the warning belongs to
    pub code: String,
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.field, self.message)
    }
}

/// A scraped subject and the field-level warnings collected on the way
#[derive(Debug, Clone)]
pub struct ScrapedSubject {
    pub subject: Subject,
    pub warnings: Vec<FieldWarning>,
}

/// Scrapes individual subject units
#[derive(Debug, Clone)]
pub struct SubjectScraper {
    fetcher: Fetcher,
    base_url: String,
    retry: RetryPolicy,
}

impl SubjectScraper {
    /// # Arguments
    ///
    /// * `fetcher` - The page fetcher
    /// * `base_url` - JupiterWeb root used to build requirements page URLs
    /// * `retry` - Retry policy for transient fetch failures
    pub fn new(fetcher: Fetcher, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            retry,
        }
    }

    /// Scrapes one subject unit
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapedSubject)` - The subject, possibly with field warnings
    /// * `Err(UnitFailure)` - The subject page could not be fetched, or it
    ///   has no code/name
    pub async fn scrape(
        &self,
        unit: &FetchUnit,
        cancel: &CancellationToken,
    ) -> Result<ScrapedSubject, UnitFailure> {
        tracing::debug!("Scraping subject {}", unit);

        let page = fetch_with_retry(&self.fetcher, unit, cancel, self.retry)
            .await
            .map_err(|e| UnitFailure::new(unit.label(), e.kind(), e.to_string()))?;

        let (mut subject, mut warnings) = parse_subject_page(unit, &page)?;

        match self.fetch_requirements(&subject.code, cancel).await {
            Ok(requirements) => subject.requirements = requirements,
            Err(RequirementsError::Fetch(FetchError::Cancelled { url })) => {
                return Err(UnitFailure::new(
                    unit.label(),
                    FailureKind::Cancelled,
                    format!("cancelled while fetching {}", url),
                ));
            }
            Err(e) => warnings.push(warn_field(&subject.code, "requirements", e.to_string())),
        }

        Ok(ScrapedSubject { subject, warnings })
    }

    async fn fetch_requirements(
        &self,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RequirementsError> {
        let url = requirements_url(&self.base_url, code)
            .map_err(|e| RequirementsError::Url(e.to_string()))?;
        let unit = FetchUnit::new(url, format!("{} requirements", code));

        let page = fetch_with_retry(&self.fetcher, &unit, cancel, self.retry)
            .await
            .map_err(RequirementsError::Fetch)?;

        parse_requirements_page(&page, code).map_err(RequirementsError::Extract)
    }
}

#[derive(Debug)]
enum RequirementsError {
    Url(String),
    Fetch(FetchError),
    Extract(ExtractError),
}

impl fmt::Display for RequirementsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(e) => write!(f, "invalid requirements URL: {}", e),
            Self::Fetch(e) => write!(f, "{}", e),
            Self::Extract(e) => write!(f, "{}", e),
        }
    }
}

/// Fetches a unit, retrying transient failures according to `policy`
///
/// The fetcher itself never retries; this is the caller-side policy.
pub async fn fetch_with_retry(
    fetcher: &Fetcher,
    unit: &FetchUnit,
    cancel: &CancellationToken,
    policy: RetryPolicy,
) -> Result<Page, FetchError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(unit, cancel).await {
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    "Retrying {} in {:?} (attempt {}/{}): {}",
                    unit,
                    delay,
                    attempt,
                    policy.max_retries,
                    e
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(FetchError::Cancelled { url: unit.url().to_string() });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            other => return other,
        }
    }
}

/// Extracts every field of a subject page
///
/// Only a missing code/name is fatal. The parsed document never outlives
/// this function, which keeps the calling future `Send`.
fn parse_subject_page(
    unit: &FetchUnit,
    page: &Page,
) -> Result<(Subject, Vec<FieldWarning>), UnitFailure> {
    let document = page.document();

    let (code, name) = extract_names(&document)
        .map_err(|e| UnitFailure::new(unit.label(), FailureKind::Fatal, e.to_string()))?;

    let mut warnings = Vec::new();

    let description = extract_description(&document).unwrap_or_else(|e| {
        warnings.push(warn_field(&code, "description", e.to_string()));
        String::new()
    });

    let stats = extract_stats(&document).unwrap_or_else(|e| {
        warnings.push(warn_field(&code, "stats", e.to_string()));
        SubjectStats::default()
    });

    let subject = Subject {
        code,
        name,
        description,
        class_credits: stats.class_credits,
        assign_credits: stats.assign_credits,
        total_hours: stats.total_hours,
        requirements: Vec::new(),
    };

    Ok((subject, warnings))
}

fn parse_requirements_page(page: &Page, code: &str) -> Result<Vec<String>, ExtractError> {
    extract_requirements(&page.document(), code)
}

fn warn_field(code: &str, field: &'static str, message: String) -> FieldWarning {
    let warning = FieldWarning {
        code: code.to_string(),
        field,
        message,
    };
    tracing::warn!("Field warning for {}", warning);
    warning
}
