//! Configuration loader
//!
//! Loads application configuration from environment variables (populated
//! from `.env` by the binary before this runs) or from a config file.
//!
//! ## Environment Variables
//! - `WORLDCAT_METADATA_API_URL`: Metadata API base URL
//! - `WORLDCAT_METADATA_API_URL_FOR_SEARCH`: search API base URL
//! - `OCLC_AUTHORIZATION_SERVER_TOKEN_URL`: OAuth token endpoint
//! - `OCLC_INSTITUTION_SYMBOL`: optional institution symbol
//! - `WORLDCAT_PRINCIPAL_ID`: optional principal id
//! - `OCLC_MAX_RECORDS_PER_REQUEST`: optional batch size (default 50)
//!
//! ## File Locations
//! When the environment is incomplete, `config.toml`, `bibsync.toml`,
//! `config.json`, and `bibsync.json` are probed in the working directory.

use std::path::{Path, PathBuf};

use bibsync_domain::{
    AppConfig, BatchConfig, BibsyncError, IdentityConfig, Result, WorldcatConfig,
};
use bibsync_domain::constants::DEFAULT_MAX_RECORDS_PER_REQUEST;

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `BibsyncError::Config` if neither source yields a complete
/// configuration.
pub fn load() -> Result<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// # Errors
/// Returns `BibsyncError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<AppConfig> {
    let api_base_url = env_var("WORLDCAT_METADATA_API_URL")?;
    let search_base_url = env_var("WORLDCAT_METADATA_API_URL_FOR_SEARCH")?;
    let token_url = env_var("OCLC_AUTHORIZATION_SERVER_TOKEN_URL")?;

    let institution_symbol = std::env::var("OCLC_INSTITUTION_SYMBOL").ok();
    let principal_id = std::env::var("WORLDCAT_PRINCIPAL_ID").ok();

    let max_records_per_request = match std::env::var("OCLC_MAX_RECORDS_PER_REQUEST") {
        Ok(raw) => raw.parse::<usize>().map_err(|e| {
            BibsyncError::Config(format!("Invalid OCLC_MAX_RECORDS_PER_REQUEST: {e}"))
        })?,
        Err(_) => DEFAULT_MAX_RECORDS_PER_REQUEST,
    };

    Ok(AppConfig {
        worldcat: WorldcatConfig { token_url, api_base_url, search_base_url },
        identity: IdentityConfig { institution_symbol, principal_id },
        batch: BatchConfig { max_records_per_request },
    })
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations. Supports TOML and
/// JSON, detected by extension.
///
/// # Errors
/// Returns `BibsyncError::Config` if no file is found or parsing fails.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BibsyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BibsyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BibsyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format detected by extension.
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BibsyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BibsyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BibsyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory.
fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    ["config.toml", "bibsync.toml", "config.json", "bibsync.json"]
        .into_iter()
        .map(|name| cwd.join(name))
        .find(|path| path.exists())
}

/// Get required environment variable.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        BibsyncError::Config(format!("Missing required environment variable: {key}"))
    })
}
