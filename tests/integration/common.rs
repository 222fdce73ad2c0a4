//! Shared fixtures: configuration and JupiterWeb page bodies

use uspy_harvest::config::{Config, HarvesterConfig, OutputConfig, SourceConfig, UserAgentConfig};

/// Creates a test configuration pointing every endpoint at the mock server
pub fn create_test_config(server_uri: &str, db_path: &str, summary_path: &str) -> Config {
    Config {
        harvester: HarvesterConfig {
            max_concurrent_fetches: 4,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
            ..HarvesterConfig::default()
        },
        user_agent: UserAgentConfig {
            name: "TestHarvester".to_string(),
            version: "1.0.0".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        source: SourceConfig {
            base_url: format!("{}/jupiterweb/", server_uri),
            professors_url: format!("{}/pessoas.php", server_uri),
            departments: vec!["SCC".to_string(), "SMA".to_string()],
            ..SourceConfig::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
            summary_path: summary_path.to_string(),
        },
    }
}

/// Institute listing with one anchor per `(name, href)`
pub fn course_listing(courses: &[(&str, &str)]) -> String {
    let rows: String = courses
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<tr><td valign="top"><a class="link_gray" href="{}">{}</a></td></tr>"#,
                href, name
            )
        })
        .collect();
    format!("<html><body><table>{}</table></body></html>", rows)
}

/// Course page linking to `obterDisciplina?sgldis=<code>` for every code
pub fn course_page(codes: &[&str]) -> String {
    let rows: String = codes
        .iter()
        .map(|code| {
            format!(
                r#"<tr><td><a class="link_gray" href="obterDisciplina?sgldis={0}">{0}</a></td></tr>"#,
                code
            )
        })
        .collect();
    format!("<html><body><table>{}</table></body></html>", rows)
}

/// Complete subject page
pub fn subject_page(code: &str, name: &str, description: &str) -> String {
    format!(
        r#"<html><body><table>
            <tr><td><b>Disciplina: {} - {}</b></td></tr>
            <tr><td><b>Objetivos</b></td></tr>
            <tr><td>{}</td></tr>
          </table><table>
            <tr valign="TOP" align="LEFT"><td><font><span class="txt_arial_8pt_gray">4</span></font></td></tr>
            <tr valign="TOP" align="LEFT"><td><font><span class="txt_arial_8pt_gray">2</span></font></td></tr>
            <tr valign="TOP" align="LEFT"><td><font><span class="txt_arial_8pt_gray">60 horas</span></font></td></tr>
          </table></body></html>"#,
        code, name, description
    )
}

/// Requirements page listing the given prerequisite codes
pub fn requirements_page(codes: &[&str]) -> String {
    let rows: String = codes
        .iter()
        .map(|code| format!("<tr><td>{} - Prerequisite</td></tr>", code))
        .collect();
    format!("<html><body><table>{}</table></body></html>", rows)
}

/// One page of the professor listing
pub fn professor_page(names: &[&str]) -> String {
    let items: String = names
        .iter()
        .map(|name| format!(r#"<div class="caption"> {} </div>"#, name))
        .collect();
    format!("<html><body>{}</body></html>", items)
}
