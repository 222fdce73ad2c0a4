//! End-to-end harvest tests against a mock JupiterWeb

use crate::common::{
    course_listing, course_page, create_test_config, professor_page, requirements_page,
    subject_page,
};
use tokio_util::sync::CancellationToken;
use uspy_harvest::harvest::{FailureKind, FetchError};
use uspy_harvest::output::{format_markdown_summary, HarvestSummary};
use uspy_harvest::storage::{
    publish_catalog, subject_document_id, DocumentStore, SqliteStorage, COURSES_COLLECTION,
    SUBJECTS_COLLECTION,
};
use uspy_harvest::{FetchUnit, HarvestError, Harvester};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, route: &str, param: Option<(&str, &str)>, body: String) {
    let mock = Mock::given(method("GET")).and(path(route));
    let mock = match param {
        Some((key, value)) => mock.and(query_param(key, value)),
        None => mock,
    };
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

const BCC: (&str, &str) = (
    "Bacharelado em Ciências de Computação",
    "listarGradeCurricular?codcg=55&codcur=55041&codhab=0",
);

/// Mounts an institute with one course (BCC) listing SMA0356, SCC0230, and
/// BAD000; BAD000 has no page and answers 404.
async fn mount_institute(server: &MockServer) {
    mount_html(server, "/jupiterweb/jupCursoLista", None, course_listing(&[BCC])).await;
    mount_bcc(server).await;
}

async fn mount_bcc(server: &MockServer) {
    mount_html(
        server,
        "/jupiterweb/listarGradeCurricular",
        Some(("codcur", "55041")),
        course_page(&["SMA0356", "SCC0230", "BAD000"]),
    )
    .await;

    mount_html(
        server,
        "/jupiterweb/obterDisciplina",
        Some(("sgldis", "SMA0356")),
        subject_page("SMA0356", "Cálculo IV", "Séries e equações diferenciais"),
    )
    .await;

    mount_html(
        server,
        "/jupiterweb/obterDisciplina",
        Some(("sgldis", "SCC0230")),
        subject_page("SCC0230", "Inteligência Artificial", "Busca e aprendizado"),
    )
    .await;

    mount_html(
        server,
        "/jupiterweb/listarCursosRequisitos",
        Some(("coddis", "SMA0356")),
        requirements_page(&["SMA0353", "SMA0354"]),
    )
    .await;
}

#[tokio::test]
async fn test_harvest_institute_drops_missing_subject() {
    let server = MockServer::start().await;
    mount_institute(&server).await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();

    let harvest = harvester.harvest_institute().await.unwrap();

    assert_eq!(harvest.courses.len(), 1);
    assert!(harvest.failed_courses.is_empty());

    let course = &harvest.courses[0];
    assert_eq!(course.course.name, "Bacharelado em Ciências de Computação");
    assert_eq!(course.course.code, "55041");
    assert_eq!(course.course.specialization.as_deref(), Some("0"));
    assert_eq!(course.expected, 3);
    assert_eq!(course.collected(), 2);
    assert_eq!(course.dropped_count(), 1);
    assert_eq!(course.dropped[0].unit, "BAD000");
    assert_eq!(course.dropped[0].kind, FailureKind::NotFound);

    let codes: Vec<_> = course.course.subjects.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(codes, vec!["SCC0230", "SMA0356"]);

    let calculus = &course.course.subjects[1];
    assert_eq!(calculus.name, "Cálculo IV");
    assert_eq!(calculus.class_credits, 4);
    assert_eq!(calculus.assign_credits, 2);
    assert_eq!(calculus.total_hours, "60 horas");
    assert_eq!(calculus.requirements, vec!["SMA0353", "SMA0354"]);

    // SCC0230 has no requirements page: the subject survives with a warning
    let ai = &course.course.subjects[0];
    assert!(ai.requirements.is_empty());
    assert!(course
        .warnings
        .iter()
        .any(|w| w.code == "SCC0230" && w.field == "requirements"));

    assert_eq!(
        course.course.subject_names.get("SMA0356").map(String::as_str),
        Some("Cálculo IV")
    );
}

#[tokio::test]
async fn test_harvest_publishes_and_summarizes() {
    let server = MockServer::start().await;
    mount_institute(&server).await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("harvest.db");
    let config = create_test_config(
        &server.uri(),
        db_path.to_str().unwrap(),
        temp_dir.path().join("summary.md").to_str().unwrap(),
    );

    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();
    let harvest = harvester.harvest_institute().await.unwrap();

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let courses: Vec<_> = harvest.courses.iter().map(|c| c.course.clone()).collect();
    let report = publish_catalog(&courses, &mut storage);

    assert_eq!(report.written, 3);
    assert_eq!(storage.count(SUBJECTS_COLLECTION).unwrap(), 2);
    assert_eq!(storage.count(COURSES_COLLECTION).unwrap(), 1);

    let doc = storage
        .read(
            SUBJECTS_COLLECTION,
            &subject_document_id("SMA0356", "55041", Some("0")),
        )
        .unwrap()
        .unwrap();
    assert_eq!(doc.payload["course_code"], "55041");
    assert_eq!(doc.payload["stats"]["worth_it"], 0);

    let summary = HarvestSummary::from_harvest(&harvest).with_publish(&report);
    assert_eq!(summary.expected(), 3);
    assert_eq!(summary.collected(), 2);
    assert_eq!(summary.dropped(), 1);

    let markdown = format_markdown_summary(&summary);
    assert!(markdown.contains("BAD000"));
    assert!(markdown.contains("- **Documents Written**: 3 (0 failed)"));
}

#[tokio::test]
async fn test_root_unavailable_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jupiterweb/jupCursoLista"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();

    let result = harvester.harvest_institute().await;

    match result {
        Err(HarvestError::RootUnavailable { source, .. }) => {
            assert!(matches!(
                source,
                FetchError::Unreachable {
                    status: Some(503),
                    ..
                }
            ));
        }
        other => panic!("expected RootUnavailable, got {:?}", other.map(|h| h.courses.len())),
    }
}

#[tokio::test]
async fn test_course_failure_is_contained() {
    let server = MockServer::start().await;
    mount_bcc(&server).await;

    let listing = course_listing(&[
        BCC,
        (
            "Bacharelado em Sistemas de Informação",
            "listarGradeCurricular?codcg=55&codcur=55090&codhab=0",
        ),
    ]);
    mount_html(&server, "/jupiterweb/jupCursoLista", None, listing).await;

    Mock::given(method("GET"))
        .and(path("/jupiterweb/listarGradeCurricular"))
        .and(query_param("codcur", "55090"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();

    let harvest = harvester.harvest_institute().await.unwrap();

    assert_eq!(harvest.courses.len(), 1);
    assert_eq!(harvest.failed_courses.len(), 1);
    assert_eq!(
        harvest.failed_courses[0].unit,
        "Bacharelado em Sistemas de Informação"
    );
    assert_eq!(harvest.failed_courses[0].kind, FailureKind::Unreachable);
    assert_eq!(harvest.collected_units(), 2);
}

#[tokio::test]
async fn test_cancelled_harvest_sends_nothing() {
    let server = MockServer::start().await;
    mount_institute(&server).await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let cancel = CancellationToken::new();
    let harvester = Harvester::new(&config, cancel.clone()).unwrap();
    cancel.cancel();

    let base = url::Url::parse(&format!("{}/jupiterweb/", server.uri())).unwrap();
    let units = ["SMA0356", "SCC0230"]
        .iter()
        .map(|code| {
            FetchUnit::resolve(&base, &format!("obterDisciplina?sgldis={}", code), *code).unwrap()
        })
        .collect();

    let harvest = harvester.harvest_subjects("BCC", units).await;

    assert_eq!(harvest.expected, 2);
    assert_eq!(harvest.cancelled, 2);
    assert_eq!(harvest.collected(), 0);
    assert!(harvest.dropped.is_empty());
}

#[tokio::test]
async fn test_departments_paginate_until_empty() {
    let server = MockServer::start().await;

    for (page, names) in [
        ("pagina=1", vec!["Ana Souza", "Bruno Lima"]),
        ("pagina=2", vec!["Carla Dias"]),
        ("pagina=3", vec![]),
    ] {
        Mock::given(method("POST"))
            .and(path("/pessoas.php"))
            .and(body_string_contains("depto=SCC"))
            .and(body_string_contains(page))
            .respond_with(ResponseTemplate::new(200).set_body_string(professor_page(&names)))
            .mount(&server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path("/pessoas.php"))
        .and(body_string_contains("depto=SMA"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();

    let listing = harvester.scrape_departments().await.unwrap();

    assert_eq!(
        listing.professors.get("SCC"),
        Some(&vec![
            "Ana Souza".to_string(),
            "Bruno Lima".to_string(),
            "Carla Dias".to_string()
        ])
    );
    assert!(!listing.professors.contains_key("SMA"));
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].unit, "SMA");
}

#[tokio::test]
async fn test_repeated_subject_links_are_accounted() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/jupiterweb/listarGradeCurricular",
        Some(("codcur", "55099")),
        course_page(&["SMA0356", "SCC0230", "SMA0356"]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/jupiterweb/obterDisciplina"))
        .and(query_param("sgldis", "SMA0356"))
        .respond_with(ResponseTemplate::new(200).set_body_string(subject_page(
            "SMA0356",
            "Cálculo IV",
            "Séries e equações diferenciais",
        )))
        .expect(1)
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/jupiterweb/obterDisciplina",
        Some(("sgldis", "SCC0230")),
        subject_page("SCC0230", "Inteligência Artificial", "Busca e aprendizado"),
    )
    .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();

    let course_url = url::Url::parse(&format!(
        "{}/jupiterweb/listarGradeCurricular?codcg=55&codcur=55099&codhab=0",
        server.uri()
    ))
    .unwrap();
    let harvest = harvester
        .harvest_course(&FetchUnit::new(course_url, "Licenciatura em Matemática"))
        .await
        .unwrap();

    assert_eq!(harvest.expected, 3);
    assert_eq!(harvest.collected(), 2);
    assert_eq!(harvest.dropped_count(), 0);
    assert_eq!(harvest.cancelled, 0);
    assert_eq!(harvest.duplicates, 1);
    assert!(harvest.is_accounted());

    let summary = HarvestSummary::from_harvest(&uspy_harvest::harvest::InstituteHarvest {
        courses: vec![harvest],
        failed_courses: Vec::new(),
    });
    assert!((summary.completeness() - 100.0).abs() < f64::EPSILON);
    assert!(format_markdown_summary(&summary).contains("- **Duplicate Links**: 1"));
}

#[tokio::test]
async fn test_unreachable_course_page_is_a_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jupiterweb/listarGradeCurricular"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let harvester = Harvester::new(&config, CancellationToken::new()).unwrap();

    let course_url = url::Url::parse(&format!(
        "{}/jupiterweb/listarGradeCurricular?codcur=55041",
        server.uri()
    ))
    .unwrap();
    let result = harvester
        .harvest_course(&FetchUnit::new(course_url, "BCC"))
        .await;

    match result {
        Err(HarvestError::Fetch(source)) => {
            assert!(matches!(
                source,
                FetchError::Unreachable {
                    status: Some(500),
                    ..
                }
            ));
        }
        other => panic!("expected a fetch error, got {:?}", other.map(|h| h.expected)),
    }
}
