//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - GET requests for catalog, subject, and requirements pages
//! - Form POST requests for the professor listing
//! - Error classification into typed fetch failures
//!
//! A fetch performs exactly one outbound request. Retrying is the caller's
//! decision (see [`crate::config::RetryPolicy`]).

use crate::config::{HarvesterConfig, UserAgentConfig};
use crate::harvest::coordinator::FailureKind;
use crate::url::FetchUnit;
use reqwest::{Client, RequestBuilder, StatusCode};
use scraper::Html;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Typed failure of a single fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The upstream answered 404
    #[error("{url} not found")]
    NotFound { url: String },

    /// The request did not complete within the configured timeout
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Non-success status, or a network-level failure when `status` is `None`
    #[error("{url} unreachable (status {status:?}): {message}")]
    Unreachable {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The fetch was aborted by the cancellation token
    #[error("request to {url} cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// Returns true for failures a retry policy may retry
    pub fn is_transient(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Maps this failure onto the unit failure taxonomy
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Unreachable { .. } => FailureKind::Unreachable,
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Page body content
    pub body: String,
}

impl Page {
    /// Parses the body into a queryable document
    ///
    /// `Html` is not `Send`, so callers parse inside synchronous helpers and
    /// never hold the document across an `.await`.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `harvester` - Timeouts applied to every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    harvester: &HarvesterConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(harvester.request_timeout())
        .connect_timeout(harvester.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Single-request page fetcher
///
/// Cloning is cheap: the underlying `reqwest::Client` is reference counted,
/// so every fan-out task gets its own handle.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from user agent and timeout settings
    pub fn from_config(
        user_agent: &UserAgentConfig,
        harvester: &HarvesterConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, harvester)?))
    }

    /// Fetches a unit with a GET request
    ///
    /// # Status Handling
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok(Page)` |
    /// | 404 | `NotFound` |
    /// | other status | `Unreachable { status: Some(..) }` |
    /// | timeout | `Timeout` |
    /// | DNS / connection failure | `Unreachable { status: None }` |
    /// | token cancelled | `Cancelled` |
    pub async fn fetch(
        &self,
        unit: &FetchUnit,
        cancel: &CancellationToken,
    ) -> Result<Page, FetchError> {
        tracing::trace!("GET {}", unit.url());
        self.send(self.client.get(unit.url().clone()), unit.url(), cancel)
            .await
    }

    /// Submits a form-encoded POST and returns the resulting page
    pub async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Page, FetchError> {
        tracing::trace!("POST {} {:?}", url, form);
        self.send(self.client.post(url.clone()).form(form), url, cancel)
            .await
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Page, FetchError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            result = request.send() => result.map_err(|e| classify_error(url, &e))?,
        };

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Unreachable {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: status.to_string(),
            });
        }

        let final_url = response.url().clone();

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled { url: url.to_string() });
            }
            result = response.text() => result.map_err(|e| classify_error(url, &e))?,
        };

        Ok(Page {
            url: final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Classifies a transport error
fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Unreachable {
            url: url.to_string(),
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}
