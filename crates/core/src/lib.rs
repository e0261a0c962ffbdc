//! # Bibsync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The record-buffer abstraction and its three operation-specific buffers
//! - The batch and search drivers with their retry policy
//! - Port/adapter interfaces (traits) for the remote API, credential
//!   storage, and row output
//!
//! ## Architecture Principles
//! - Only depends on `bibsync-domain`
//! - No HTTP or filesystem code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod buffer;
pub mod ports;
pub mod runner;

// Re-export specific items to avoid ambiguity
pub use buffer::holdings_check::{HoldingsCheckBuffer, HoldingsCheckSinks};
pub use buffer::holding_update::{HoldingUpdateBuffer, HoldingUpdateSinks};
pub use buffer::search::{SearchBuffer, SearchSinks};
pub use buffer::RecordBuffer;
pub use ports::{
    BriefBibSearchResponse, BriefRecord, Cascade, ControlNumberCheckResponse, ControlNumberEntry,
    HoldingEntry, HoldingOperation, HoldingUpdateResponse, RowSink, TokenStore, WorldcatApi,
};
pub use runner::chunked::{BatchRow, ChunkedRunner};
pub use runner::search::SearchRunner;
