use crate::UrlError;
use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// JupiterWeb emits relative links (`obterDisciplina?sgldis=...`) that are
/// relative to the page they appear on, so every link found on a listing page
/// goes through here before becoming a fetch unit.
///
/// Rejected links:
/// - empty or fragment-only hrefs
/// - `javascript:` and `mailto:` links
/// - anything that does not resolve to HTTP(S)
pub fn resolve_link(base: &Url, href: &str) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Err(UrlError::Resolve {
            href: href.to_string(),
            message: "empty or fragment-only link".to_string(),
        });
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") {
        return Err(UrlError::InvalidScheme(href.to_string()));
    }

    let absolute = base.join(href).map_err(|e| UrlError::Resolve {
        href: href.to_string(),
        message: e.to_string(),
    })?;

    match absolute.scheme() {
        "http" | "https" => Ok(absolute),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}
