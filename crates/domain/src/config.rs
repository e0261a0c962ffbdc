//! Configuration structures
//!
//! Loaded by the infra layer from environment variables (after `.env`
//! loading) with a file fallback; see `bibsync-infra::config`.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_RECORDS_PER_REQUEST;

/// Remote API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldcatConfig {
    /// OAuth authorization server token endpoint.
    pub token_url: String,
    /// Base URL of the Metadata API (control numbers, holdings).
    pub api_base_url: String,
    /// Base URL of the search API (brief bibliographic resources).
    pub search_base_url: String,
}

/// Optional identity values attached to outgoing requests as the
/// transaction id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub institution_symbol: Option<String>,
    #[serde(default)]
    pub principal_id: Option<String>,
}

/// Batch sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Identifiers per batched API request.
    #[serde(default = "default_max_records")]
    pub max_records_per_request: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_records_per_request: DEFAULT_MAX_RECORDS_PER_REQUEST }
    }
}

fn default_max_records() -> usize {
    DEFAULT_MAX_RECORDS_PER_REQUEST
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub worldcat: WorldcatConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}
