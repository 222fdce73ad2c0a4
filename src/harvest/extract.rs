//! Field extractors for JupiterWeb pages
//!
//! Every extractor is a pure function over a parsed document and is fallible
//! on its own: a failure in one never prevents the others from running.
//!
//! The upstream pages carry no semantic markup, so the extractors rely on
//! fixed structural assumptions (bold labels, positional table cells, CSS
//! classes). Each assumption lives in exactly one function here; when the
//! upstream layout drifts, the affected extractor returns a typed
//! [`ExtractError`] instead of producing garbage.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Label prefix of the bold node holding `CODE - NAME`
const SUBJECT_LABEL: &str = "Disciplina:";

/// Bold label preceding the description row
const DESCRIPTION_LABEL: &str = "Objetivos";

/// Element present when the upstream reports an unknown or inactive subject
const NOT_FOUND_MARKER: &str = "#web_mensagem";

/// Positional cells holding class credits, assignment credits, total hours
const STATS_SELECTOR: &str =
    r#"tr[valign="TOP"][align="LEFT"] > td > font > span[class="txt_arial_8pt_gray"]"#;

const COURSE_LINK_SELECTOR: &str = r#"td[valign="top"] a.link_gray"#;
const SUBJECT_LINK_SELECTOR: &str = "td > .link_gray";
const PROFESSOR_SELECTOR: &str = ".caption";

const SUBJECT_CODE_PATTERN: &str = r"\b[A-Z]{3}\d{4}\b";

/// Errors produced by field extractors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("page reports the subject does not exist")]
    NotFound,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unexpected structure for {field}: expected {expected} matches, found {found}")]
    Structure {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid pattern: {0}")]
    Pattern(String),
}

/// Credit and workload figures of a subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectStats {
    pub class_credits: u32,
    pub assign_credits: u32,
    pub total_hours: String,
}

/// A link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    /// Link text with whitespace collapsed
    pub text: String,

    /// Raw `href`, if the anchor has one
    pub href: Option<String>,
}

/// Extracts `(code, name)` from the `Disciplina: CODE - NAME` label
///
/// The label is split on the first `-`, so names containing dashes survive
/// intact. This is the only extractor whose failure is fatal for a unit.
pub fn extract_names(document: &Html) -> Result<(String, String), ExtractError> {
    let bold = selector("b")?;

    for element in document.select(&bold) {
        let text = element.text().collect::<String>();
        let Some(rest) = text.trim().strip_prefix(SUBJECT_LABEL) else {
            continue;
        };

        let (code, name) = rest
            .split_once('-')
            .ok_or(ExtractError::MissingField("subject name"))?;

        let code = code.trim();
        if code.is_empty() {
            return Err(ExtractError::MissingField("subject code"));
        }

        return Ok((code.to_string(), name.trim().to_string()));
    }

    Err(ExtractError::MissingField("subject label"))
}

/// Extracts the description from the row following the `Objetivos` label
///
/// Fails fast with [`ExtractError::NotFound`] when the page carries the
/// upstream "subject not found" marker.
pub fn extract_description(document: &Html) -> Result<String, ExtractError> {
    if has_not_found_marker(document)? {
        return Err(ExtractError::NotFound);
    }

    let bold = selector("b")?;
    let label = document
        .select(&bold)
        .filter(|b| b.inner_html().trim_matches(' ') == DESCRIPTION_LABEL)
        .last()
        .ok_or(ExtractError::MissingField("description label"))?;

    let row = label
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")
        .ok_or(ExtractError::MissingField("description row"))?;

    // A label in the last row means an empty description, not a broken page
    let description = row
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")
        .map(|next| next.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    Ok(description)
}

/// Extracts class credits, assignment credits, and total hours
///
/// Relies on the first three cells matched by [`STATS_SELECTOR`] being, in
/// order, class credits, assignment credits, and total hours. Fewer than
/// three matches means the layout changed and yields
/// [`ExtractError::Structure`]. Credits that don't parse as integers are 0.
pub fn extract_stats(document: &Html) -> Result<SubjectStats, ExtractError> {
    let cells_selector = selector(STATS_SELECTOR)?;
    let cells: Vec<String> = document
        .select(&cells_selector)
        .map(|e| e.text().collect::<String>())
        .collect();

    if cells.len() < 3 {
        return Err(ExtractError::Structure {
            field: "stats",
            expected: 3,
            found: cells.len(),
        });
    }

    Ok(SubjectStats {
        class_credits: parse_credits(&cells[0]),
        assign_credits: parse_credits(&cells[1]),
        total_hours: collapse_whitespace(&cells[2]),
    })
}

/// Extracts prerequisite codes from a requirements page
///
/// Codes are collected from table cells in document order, deduplicated,
/// and exclude `own_code`. A page carrying the not-found marker means the
/// subject has no requirements and yields an empty list.
pub fn extract_requirements(document: &Html, own_code: &str) -> Result<Vec<String>, ExtractError> {
    if has_not_found_marker(document)? {
        return Ok(Vec::new());
    }

    let pattern =
        Regex::new(SUBJECT_CODE_PATTERN).map_err(|e| ExtractError::Pattern(e.to_string()))?;
    let cells = selector("td")?;

    let mut codes: Vec<String> = Vec::new();
    for cell in document.select(&cells) {
        let text = cell.text().collect::<String>();
        for found in pattern.find_iter(&text) {
            let code = found.as_str();
            if code != own_code && !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
    }

    Ok(codes)
}

/// Extracts course links from the institute course listing
pub fn extract_course_links(document: &Html) -> Result<Vec<ListingLink>, ExtractError> {
    extract_links(document, COURSE_LINK_SELECTOR)
}

/// Extracts subject links from a course page
pub fn extract_subject_links(document: &Html) -> Result<Vec<ListingLink>, ExtractError> {
    extract_links(document, SUBJECT_LINK_SELECTOR)
}

/// Extracts professor names from one page of the professor listing
pub fn extract_professors(document: &Html) -> Result<Vec<String>, ExtractError> {
    let captions = selector(PROFESSOR_SELECTOR)?;
    Ok(document
        .select(&captions)
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .filter(|name| !name.is_empty())
        .collect())
}

/// Returns true if the page carries the upstream "not found" marker
pub fn has_not_found_marker(document: &Html) -> Result<bool, ExtractError> {
    let marker = selector(NOT_FOUND_MARKER)?;
    Ok(document.select(&marker).next().is_some())
}

/// Collapses internal whitespace runs into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_links(document: &Html, css: &'static str) -> Result<Vec<ListingLink>, ExtractError> {
    let anchors = selector(css)?;
    Ok(document
        .select(&anchors)
        .map(|e| ListingLink {
            text: collapse_whitespace(&e.text().collect::<String>()),
            href: e.value().attr("href").map(str::to_string),
        })
        .collect())
}

fn parse_credits(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Pattern(format!("{}: {:?}", css, e)))
}
