//! Request timeout and caller-side retry behavior

use crate::common::create_test_config;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uspy_harvest::config::{Config, RetryPolicy};
use uspy_harvest::harvest::{fetch_with_retry, FetchError, Fetcher};
use uspy_harvest::FetchUnit;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(config: &Config) -> Fetcher {
    Fetcher::from_config(&config.user_agent, &config.harvester).unwrap()
}

fn unit(server: &MockServer, route: &str) -> FetchUnit {
    let url = url::Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
    FetchUnit::new(url, route)
}

fn retries(max_retries: u32, backoff_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff: Duration::from_millis(backoff_ms),
    }
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), ":memory:", "unused.md");
    config.harvester.request_timeout_secs = 1;

    let result = fetcher(&config)
        .fetch(&unit(&server, "/slow"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(FetchError::Timeout { .. })));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");

    let page = fetch_with_retry(
        &fetcher(&config),
        &unit(&server, "/flaky"),
        &CancellationToken::new(),
        retries(2, 10),
    )
    .await
    .unwrap();

    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("ok"));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");

    let result = fetch_with_retry(
        &fetcher(&config),
        &unit(&server, "/gone"),
        &CancellationToken::new(),
        retries(3, 10),
    )
    .await;

    assert!(matches!(result, Err(FetchError::NotFound { .. })));
}

#[tokio::test]
async fn test_retries_stop_after_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");

    let result = fetch_with_retry(
        &fetcher(&config),
        &unit(&server, "/down"),
        &CancellationToken::new(),
        retries(2, 10),
    )
    .await;

    assert!(matches!(
        result,
        Err(FetchError::Unreachable {
            status: Some(503),
            ..
        })
    ));
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), ":memory:", "unused.md");
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let fetcher = fetcher(&config);
    let target = unit(&server, "/down");
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        fetch_with_retry(&fetcher, &target, &cancel, retries(5, 30_000)),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(FetchError::Cancelled { .. })));
}
