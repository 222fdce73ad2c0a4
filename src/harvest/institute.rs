//! Institute and course harvesting
//!
//! The institute listing is the catalog root: if it can't be fetched the
//! whole harvest fails. Below the root, every failure is contained: a course
//! page that can't be fetched is recorded as a failed course, and a subject
//! that can't be scraped is recorded as a dropped unit of its course.

use crate::config::{Config, RetryPolicy, SourceConfig};
use crate::harvest::coordinator::{fan_out, FailureKind, FanOutLimits, UnitFailure};
use crate::harvest::extract::{extract_course_links, extract_subject_links, ExtractError, ListingLink};
use crate::harvest::fetcher::{Fetcher, Page};
use crate::harvest::merge::merge_course;
use crate::harvest::model::Course;
use crate::harvest::unit::{fetch_with_retry, FieldWarning, SubjectScraper};
use crate::url::{course_listing_url, query_param, FetchUnit};
use crate::HarvestError;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of harvesting one course
#[derive(Debug, Clone)]
pub struct CourseHarvest {
    pub course: Course,

    /// Subject links found on the course page
    pub expected: usize,

    /// Subjects that could not be scraped
    pub dropped: Vec<UnitFailure>,

    /// Subjects abandoned because of cancellation
    pub cancelled: usize,

    /// Links repeating a subject already listed on the page
    pub duplicates: usize,

    /// Field-level warnings of the collected subjects
    pub warnings: Vec<FieldWarning>,
}

impl CourseHarvest {
    pub fn collected(&self) -> usize {
        self.course.subjects.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Every listed link is collected, dropped, cancelled, or a duplicate
    pub fn is_accounted(&self) -> bool {
        self.collected() + self.dropped_count() + self.cancelled + self.duplicates == self.expected
    }
}

/// Result of harvesting the whole institute
#[derive(Debug, Clone, Default)]
pub struct InstituteHarvest {
    pub courses: Vec<CourseHarvest>,

    /// Courses whose page could not be fetched or linked
    pub failed_courses: Vec<UnitFailure>,
}

impl InstituteHarvest {
    pub fn expected_units(&self) -> usize {
        self.courses.iter().map(|c| c.expected).sum()
    }

    pub fn collected_units(&self) -> usize {
        self.courses.iter().map(CourseHarvest::collected).sum()
    }

    pub fn dropped_units(&self) -> usize {
        self.courses.iter().map(CourseHarvest::dropped_count).sum()
    }

    pub fn duplicate_units(&self) -> usize {
        self.courses.iter().map(|c| c.duplicates).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.courses.iter().map(|c| c.warnings.len()).sum()
    }
}

/// Catalog harvester
///
/// Holds the shared fetcher, the subject scraper, the fan-out limits, and
/// the cancellation token threaded into every fetch.
pub struct Harvester {
    fetcher: Fetcher,
    scraper: SubjectScraper,
    source: SourceConfig,
    retry: RetryPolicy,
    limits: FanOutLimits,
    cancel: CancellationToken,
}

impl Harvester {
    /// Creates a harvester from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `cancel` - Token that aborts in-flight requests when cancelled
    pub fn new(config: &Config, cancel: CancellationToken) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::from_config(&config.user_agent, &config.harvester)?;
        Ok(Self::with_fetcher(fetcher, config, cancel))
    }

    /// Creates a harvester around an existing fetcher
    pub fn with_fetcher(fetcher: Fetcher, config: &Config, cancel: CancellationToken) -> Self {
        let retry = config.harvester.retry_policy();
        let scraper = SubjectScraper::new(fetcher.clone(), config.source.base_url.clone(), retry);

        Self {
            fetcher,
            scraper,
            source: config.source.clone(),
            retry,
            limits: FanOutLimits::from(&config.harvester),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub(crate) fn source(&self) -> &SourceConfig {
        &self.source
    }

    pub(crate) fn limits(&self) -> FanOutLimits {
        self.limits
    }

    /// Harvests every course of the configured institute
    ///
    /// # Returns
    ///
    /// * `Ok(InstituteHarvest)` - Every course, with per-course audit counts
    /// * `Err(HarvestError::RootUnavailable)` - The course listing could not
    ///   be fetched; no partial result is returned
    pub async fn harvest_institute(&self) -> Result<InstituteHarvest, HarvestError> {
        let listing_url = course_listing_url(&self.source)?;
        tracing::info!("Fetching course listing {}", listing_url);

        let listing = FetchUnit::new(listing_url, "course listing");
        let page = fetch_with_retry(&self.fetcher, &listing, &self.cancel, self.retry)
            .await
            .map_err(|source| HarvestError::RootUnavailable {
                url: listing.url().to_string(),
                source,
            })?;

        let links = parse_listing(&page, extract_course_links)?;
        tracing::info!("Found {} courses", links.len());

        let mut harvest = InstituteHarvest::default();
        for link in links {
            if self.cancel.is_cancelled() {
                tracing::warn!("Harvest cancelled, skipping remaining courses");
                break;
            }

            let unit = match resolve_listing_link(&page.url, &link) {
                Ok(unit) => unit,
                Err(failure) => {
                    tracing::warn!("Skipping course: {}", failure);
                    harvest.failed_courses.push(failure);
                    continue;
                }
            };

            match self.harvest_course(&unit).await {
                Ok(course) => harvest.courses.push(course),
                Err(e) => {
                    tracing::warn!("Course {} failed: {}", unit, e);
                    harvest.failed_courses.push(UnitFailure::new(
                        unit.label(),
                        failure_kind(&e),
                        e.to_string(),
                    ));
                }
            }
        }

        tracing::info!(
            "Institute harvest finished: {} courses, {}/{} subjects, {} dropped, {} failed courses",
            harvest.courses.len(),
            harvest.collected_units(),
            harvest.expected_units(),
            harvest.dropped_units(),
            harvest.failed_courses.len()
        );

        Ok(harvest)
    }

    /// Harvests one course page and all of its subjects
    ///
    /// The unit's label is used as the course name; the course code and
    /// specialization come from the `codcur` and `codhab` query parameters.
    ///
    /// # Returns
    ///
    /// * `Ok(CourseHarvest)` - The course (possibly with zero subjects)
    /// * `Err(HarvestError::Fetch)` - The course page could not be fetched
    pub async fn harvest_course(&self, unit: &FetchUnit) -> Result<CourseHarvest, HarvestError> {
        tracing::info!("Harvesting course {}", unit);

        let page = fetch_with_retry(&self.fetcher, unit, &self.cancel, self.retry).await?;

        let links = parse_listing(&page, extract_subject_links)?;
        let expected = links.len();

        let mut units = Vec::with_capacity(links.len());
        let mut dropped = Vec::new();
        for link in &links {
            match resolve_listing_link(&page.url, link) {
                Ok(subject_unit) => units.push(subject_unit),
                Err(failure) => {
                    tracing::warn!("{} has no subject page", link.text);
                    dropped.push(failure);
                }
            }
        }

        if expected == 0 {
            tracing::info!("Course {} lists no subjects", unit.label());
        }

        let code = query_param(unit.url(), "codcur").unwrap_or_else(|| unit.label().to_string());
        let specialization = query_param(unit.url(), "codhab");

        let mut harvest = self
            .scrape_course(unit.label(), code, specialization, units)
            .await;
        harvest.expected = expected;
        dropped.append(&mut harvest.dropped);
        harvest.dropped = dropped;

        if !harvest.dropped.is_empty() {
            tracing::warn!(
                "Course {}: collected {} of {} subjects ({} dropped)",
                harvest.course.name,
                harvest.collected(),
                expected,
                harvest.dropped_count()
            );
        }

        Ok(harvest)
    }

    /// Harvests the subjects behind an explicit list of units
    ///
    /// Used when the caller already knows the subject pages; the result is
    /// merged into a course named `name`.
    pub async fn harvest_subjects(&self, name: &str, units: Vec<FetchUnit>) -> CourseHarvest {
        self.scrape_course(name, name.to_string(), None, units).await
    }

    /// Fans the subject units of one course out and merges what comes back
    ///
    /// Units repeating an earlier URL are not fetched again, and subjects the
    /// merge folds together are counted the same way, so that `expected`
    /// always equals collected + dropped + cancelled + duplicates.
    async fn scrape_course(
        &self,
        name: &str,
        code: String,
        specialization: Option<String>,
        units: Vec<FetchUnit>,
    ) -> CourseHarvest {
        let expected = units.len();
        let (units, repeated_links) = dedup_units(units);
        if repeated_links > 0 {
            tracing::debug!("Course {} lists {} subject links twice", name, repeated_links);
        }

        let scraper = self.scraper.clone();
        let report = fan_out(units, self.limits, &self.cancel, move |unit, cancel| {
            let scraper = scraper.clone();
            async move { scraper.scrape(&unit, &cancel).await }
        })
        .await;

        let scraped = report.collected.len();
        let mut subjects = Vec::with_capacity(scraped);
        let mut warnings = Vec::new();
        for item in report.collected {
            warnings.extend(item.warnings);
            subjects.push(item.subject);
        }

        let course = merge_course(name, code, specialization, subjects);
        let merged = scraped.saturating_sub(course.subjects.len());

        CourseHarvest {
            course,
            expected,
            dropped: report.dropped,
            cancelled: report.cancelled,
            duplicates: repeated_links + merged,
            warnings,
        }
    }
}

/// Keeps the first unit for every URL and counts the rest
fn dedup_units(units: Vec<FetchUnit>) -> (Vec<FetchUnit>, usize) {
    let total = units.len();
    let mut seen = HashSet::with_capacity(total);
    let distinct: Vec<_> = units
        .into_iter()
        .filter(|unit| seen.insert(unit.url().clone()))
        .collect();
    let repeated = total - distinct.len();
    (distinct, repeated)
}

/// Runs a listing extractor on a page; the document is dropped on return
fn parse_listing(
    page: &Page,
    extractor: fn(&scraper::Html) -> Result<Vec<ListingLink>, ExtractError>,
) -> Result<Vec<ListingLink>, HarvestError> {
    extractor(&page.document()).map_err(|e| HarvestError::Parse {
        url: page.url.to_string(),
        message: e.to_string(),
    })
}

fn resolve_listing_link(base: &Url, link: &ListingLink) -> Result<FetchUnit, UnitFailure> {
    let href = link
        .href
        .as_deref()
        .ok_or_else(|| UnitFailure::new(&link.text, FailureKind::Parse, "link has no href"))?;

    FetchUnit::resolve(base, href, link.text.clone())
        .map_err(|e| UnitFailure::new(&link.text, FailureKind::Parse, e.to_string()))
}

fn failure_kind(error: &HarvestError) -> FailureKind {
    match error {
        HarvestError::RootUnavailable { source, .. } | HarvestError::Fetch(source) => source.kind(),
        HarvestError::Parse { .. } => FailureKind::Parse,
        HarvestError::NotFound(_) => FailureKind::NotFound,
        HarvestError::Storage(_) => FailureKind::Storage,
        _ => FailureKind::Unreachable,
    }
}
