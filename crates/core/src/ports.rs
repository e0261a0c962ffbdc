//! Port interfaces for the remote API, credential storage, and row output
//!
//! Infrastructure adapters implement these traits; the buffers and runners
//! depend only on the traits so tests can inject in-memory fakes.

use async_trait::async_trait;
use bibsync_domain::{Credentials, Result};
use serde::Deserialize;

/// One entry of a control-number check response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlNumberEntry {
    pub requested_oclc_number: String,
    #[serde(default)]
    pub current_oclc_number: String,
    pub found: bool,
    #[serde(default)]
    pub merged: bool,
}

/// Response of `GET /bib/checkcontrolnumbers`.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlNumberCheckResponse {
    pub entry: Vec<ControlNumberEntry>,
}

/// One entry of a holdings set/unset response. `http_status_code` is the
/// API's embedded per-record status string (e.g. `"HTTP 200 OK"`), distinct
/// from the outer response status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingEntry {
    pub requested_oclc_number: String,
    #[serde(default)]
    pub current_oclc_number: String,
    pub http_status_code: String,
    #[serde(default)]
    pub error_detail: String,
}

/// Response of `POST|DELETE /ih/datalist`.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingUpdateResponse {
    pub entry: Vec<HoldingEntry>,
}

/// Abbreviated bibliographic record from the search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefRecord {
    pub oclc_number: String,
}

/// Response of `GET /brief-bibs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefBibSearchResponse {
    pub number_of_records: u64,
    #[serde(default)]
    pub brief_records: Vec<BriefRecord>,
}

/// Operation applied to institution holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingOperation {
    Set,
    Unset,
}

impl HoldingOperation {
    /// Human-readable verb, used in log lines and output messages.
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Unset => "unset",
        }
    }
}

/// Cascade policy for the unset operation: whether local holdings or
/// bibliographic records block the unset or are deleted along with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cascade {
    /// Do not unset when a local holdings or bibliographic record exists.
    Prevent,
    /// Unset and delete dependent local records.
    DeleteLocal,
}

impl Cascade {
    /// The wire value of the `cascade` query parameter.
    #[must_use]
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Prevent => "0",
            Self::DeleteLocal => "1",
        }
    }
}

/// The three remote operations this system performs.
///
/// Implementations authenticate the request, attach the transaction id, and
/// renew expired tokens transparently. Undecodable response bodies surface
/// as `MalformedResponse`; HTTP error statuses as `Http { status, .. }`.
#[async_trait]
pub trait WorldcatApi: Send + Sync {
    /// Check a comma-joined batch of control numbers for currency.
    async fn check_control_numbers(&self, oclc_numbers: &str)
        -> Result<ControlNumberCheckResponse>;

    /// Set or unset the institution holding on a comma-joined batch of
    /// control numbers. `cascade` applies to unset only.
    async fn update_holdings(
        &self,
        operation: HoldingOperation,
        oclc_numbers: &str,
        cascade: Option<Cascade>,
    ) -> Result<HoldingUpdateResponse>;

    /// Search brief bibliographic resources, optionally filtered to records
    /// held by the given institution symbol.
    async fn search_brief_bibs(
        &self,
        query: &str,
        held_by_symbol: Option<&str>,
    ) -> Result<BriefBibSearchResponse>;
}

/// Durable storage for OAuth credentials.
///
/// `persist` must be idempotent: writing the same value twice is a no-op
/// side effect but never an error.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Credentials>;
    async fn persist(&self, credentials: &Credentials) -> Result<()>;
}

/// Append-only tabular output for one classification bucket.
///
/// Implementations write their header lazily on the first row, so a bucket
/// that receives no rows produces no header.
pub trait RowSink: Send {
    fn write_row(&mut self, fields: &[&str]) -> Result<()>;

    /// Flush buffered rows to the underlying storage.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
