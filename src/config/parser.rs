//! Configuration file loading
//!
//! A run records the hash of the bytes its configuration was parsed from,
//! so the file is read once and both the config and the hash come from
//! that single read.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// # Example
///
/// ```
/// use uspy_harvest::config::parse_config;
///
/// let config = parse_config(r#"
/// [user-agent]
/// name = "uspy-harvest"
/// version = "1.0"
/// contact-email = "dev@uspy.me"
///
/// [output]
/// database-path = "harvest.db"
/// summary-path = "summary.md"
/// "#).unwrap();
/// assert_eq!(config.source.institute_code, 55);
/// ```
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads the harvest configuration at `path`
///
/// # Returns
///
/// * `Ok(Config)` - The validated configuration
/// * `Err(ConfigError::Read)` - The file could not be read
/// * `Err(ConfigError::Parse | ConfigError::Validation)` - The file is not a
///   valid harvest configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&read_config_file(path)?)
}

/// Hex-encoded SHA-256 of configuration text
pub fn hash_config(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads the configuration at `path` together with the hash stored on runs
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = read_config_file(path)?;
    let config = parse_config(&content)?;
    let hash = hash_config(&content);

    tracing::debug!(
        "Parsed {} ({} departments, hash {})",
        path.display(),
        config.source.departments.len(),
        hash
    );

    Ok((config, hash))
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}
