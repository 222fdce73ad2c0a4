//! uspy-harvest: a concurrent catalog harvester for JupiterWeb
//!
//! This crate scrapes the course and subject catalog of a university
//! institute from its HTML listing pages, normalizes it into typed entities,
//! and aggregates offering statistics over stored comment documents.

pub mod config;
pub mod harvest;
pub mod offerings;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog root {url} is unavailable: {source}")]
    RootUnavailable {
        url: String,
        source: harvest::FetchError,
    },

    #[error("Fetch error: {0}")]
    Fetch(#[from] harvest::FetchError),

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to resolve link '{href}': {message}")]
    Resolve { href: String, message: String },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{Course, Harvester, Subject};
pub use offerings::{aggregate_offerings, rank_offerings, OfferingView, Rates};
pub use url::FetchUnit;
