//! URL handling module
//!
//! This module provides the fetch unit descriptor submitted to the fan-out
//! coordinator, link resolution against a page base URL, and the builders for
//! the JupiterWeb endpoints the harvester visits.

mod endpoints;
mod resolve;

pub use endpoints::{course_listing_url, query_param, requirements_url};
pub use resolve::resolve_link;

use crate::UrlResult;
use std::fmt;
use url::Url;

/// One independently fetchable resource
///
/// A `FetchUnit` is immutable once created: it carries the resolved absolute
/// URL and a label (usually the link text) used in logs and failure reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchUnit {
    url: Url,
    label: String,
}

impl FetchUnit {
    /// Creates a unit from an already absolute URL
    pub fn new(url: Url, label: impl Into<String>) -> Self {
        Self {
            url,
            label: label.into(),
        }
    }

    /// Creates a unit by resolving `href` against the page it was found on
    ///
    /// # Arguments
    ///
    /// * `base` - The URL of the page containing the link
    /// * `href` - The raw `href` attribute value
    /// * `label` - Diagnostic label for the unit
    ///
    /// # Returns
    ///
    /// * `Ok(FetchUnit)` - The resolved unit
    /// * `Err(UrlError)` - The link could not be resolved to an HTTP(S) URL
    pub fn resolve(base: &Url, href: &str, label: impl Into<String>) -> UrlResult<Self> {
        let url = resolve_link(base, href)?;
        Ok(Self::new(url, label))
    }

    /// The absolute URL of this unit
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The diagnostic label of this unit
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for FetchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_unit() {
        let base = Url::parse("https://uspdigital.usp.br/jupiterweb/jupCursoLista").unwrap();
        let unit = FetchUnit::resolve(&base, "obterDisciplina?sgldis=SMA0356", "SMA0356").unwrap();

        assert_eq!(
            unit.url().as_str(),
            "https://uspdigital.usp.br/jupiterweb/obterDisciplina?sgldis=SMA0356"
        );
        assert_eq!(unit.label(), "SMA0356");
    }

    #[test]
    fn test_display_includes_label_and_url() {
        let unit = FetchUnit::new(Url::parse("https://example.com/a").unwrap(), "A");
        assert_eq!(unit.to_string(), "A (https://example.com/a)");
    }
}
