use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Concurrency, timeout, and retry behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HarvesterConfig {
    /// Maximum number of units processed at the same time
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent")]
    pub max_concurrent_fetches: u32,

    /// Total time allowed for a single request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Time allowed to establish a connection (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Retries for transient failures (timeouts, unreachable hosts)
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Base delay between retries; attempt `n` waits `n * backoff`
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl HarvesterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

/// Caller-side retry policy for transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self::default()
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    pub name: String,

    /// Version of the harvester
    pub version: String,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value: `Name/Version (+Email)`
    pub fn header_value(&self) -> String {
        format!("{}/{} (+{})", self.name, self.version, self.contact_email)
    }
}

/// Upstream source locations
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// JupiterWeb root, must end with `/`
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Institute code (`codcg`)
    #[serde(rename = "institute-code", default = "default_institute_code")]
    pub institute_code: u32,

    /// Course type filter (`tipo`)
    #[serde(rename = "course-type", default = "default_course_type")]
    pub course_type: String,

    /// Professor listing endpoint (form POST)
    #[serde(rename = "professors-url", default = "default_professors_url")]
    pub professors_url: String,

    /// Departments whose professors are listed
    #[serde(default = "default_departments")]
    pub departments: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            institute_code: default_institute_code(),
            course_type: default_course_type(),
            professors_url: default_professors_url(),
            departments: default_departments(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

fn default_max_concurrent() -> u32 {
    16
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_base_url() -> String {
    "https://uspdigital.usp.br/jupiterweb/".to_string()
}

fn default_institute_code() -> u32 {
    55
}

fn default_course_type() -> String {
    "N".to_string()
}

fn default_professors_url() -> String {
    "https://www.icmc.usp.br/templates/icmc2015/php/pessoas.php".to_string()
}

fn default_departments() -> Vec<String> {
    ["SCC", "SMA", "SME", "SSC"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}
