//! Department professor listing
//!
//! The listing is a paginated form: page N is requested by POSTing the
//! department code and page number, and the last page is the first one that
//! returns no name captions.

use crate::harvest::coordinator::{fan_out, UnitFailure};
use crate::harvest::extract::extract_professors;
use crate::harvest::fetcher::{FetchError, Fetcher, Page};
use crate::harvest::institute::Harvester;
use crate::HarvestError;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound on pages requested per department
const MAX_PAGES: u32 = 200;

/// Professors of every department that could be listed
#[derive(Debug, Clone, Default)]
pub struct DepartmentListing {
    /// Department code -> professor names, in listing order
    pub professors: BTreeMap<String, Vec<String>>,

    /// Departments whose first page could not be fetched
    pub failures: Vec<UnitFailure>,
}

impl DepartmentListing {
    pub fn professor_count(&self) -> usize {
        self.professors.values().map(Vec::len).sum()
    }
}

impl Harvester {
    /// Lists the professors of every configured department
    ///
    /// Departments are fetched concurrently; pages within a department are
    /// sequential since the end of the listing is only known by reaching it.
    pub async fn scrape_departments(&self) -> Result<DepartmentListing, HarvestError> {
        let url = Url::parse(&self.source().professors_url)?;
        let departments = self.source().departments.clone();
        tracing::info!("Listing professors of {} departments", departments.len());

        let fetcher = self.fetcher().clone();
        let cancel = self.cancellation_token();
        let report = fan_out(departments, self.limits(), cancel, move |dept, cancel| {
            let fetcher = fetcher.clone();
            let url = url.clone();
            async move {
                match list_department(&fetcher, &url, &dept, &cancel).await {
                    Ok(names) => Ok((dept, names)),
                    Err(e) => Err(UnitFailure::new(dept, e.kind(), e.to_string())),
                }
            }
        })
        .await;

        let listing = DepartmentListing {
            professors: report.collected.into_iter().collect(),
            failures: report.dropped,
        };

        tracing::info!(
            "Listed {} professors in {} departments ({} failed)",
            listing.professor_count(),
            listing.professors.len(),
            listing.failures.len()
        );

        Ok(listing)
    }
}

/// Walks the pages of one department until an empty page
///
/// A failure on the first page fails the department. A failure on a later
/// page ends the walk and keeps the names collected so far.
async fn list_department(
    fetcher: &Fetcher,
    url: &Url,
    department: &str,
    cancel: &CancellationToken,
) -> Result<Vec<String>, FetchError> {
    let mut names = Vec::new();

    for page_number in 1..=MAX_PAGES {
        let page_param = page_number.to_string();
        let form = [
            ("grupo", "Docente"),
            ("depto", department),
            ("nome", ""),
            ("pagina", page_param.as_str()),
        ];

        let page = match fetcher.post_form(url, &form, cancel).await {
            Ok(page) => page,
            Err(e) if page_number == 1 || matches!(e, FetchError::Cancelled { .. }) => {
                return Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    "Department {} page {} failed, keeping {} names: {}",
                    department,
                    page_number,
                    names.len(),
                    e
                );
                return Ok(names);
            }
        };

        let page_names = parse_professor_page(&page);
        if page_names.is_empty() {
            tracing::debug!("Department {} ends at page {}", department, page_number);
            return Ok(names);
        }
        names.extend(page_names);
    }

    tracing::warn!(
        "Department {} still listing after {} pages, stopping",
        department,
        MAX_PAGES
    );
    Ok(names)
}

fn parse_professor_page(page: &Page) -> Vec<String> {
    extract_professors(&page.document()).unwrap_or_else(|e| {
        tracing::warn!("Unreadable professor page {}: {}", page.url, e);
        Vec::new()
    })
}
