//! JupiterWeb endpoint builders

use crate::config::SourceConfig;
use url::Url;

/// Builds the institute course listing URL (`jupCursoLista?codcg=..&tipo=..`)
pub fn course_listing_url(source: &SourceConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&source.base_url)?.join("jupCursoLista")?;
    url.query_pairs_mut()
        .append_pair("codcg", &source.institute_code.to_string())
        .append_pair("tipo", &source.course_type);
    Ok(url)
}

/// Builds the requirements page URL for a subject code
pub fn requirements_url(base_url: &str, code: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?.join("listarCursosRequisitos")?;
    url.query_pairs_mut().append_pair("coddis", code);
    Ok(url)
}

/// Returns the first value of a query parameter, if present and non-empty
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
