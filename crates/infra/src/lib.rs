//! # Bibsync Infra
//!
//! Infrastructure adapters for the Bibsync core:
//! - reqwest HTTP transport
//! - OAuth-renewing authenticated WorldCat client
//! - dotenv-file credential store
//! - environment/file configuration loader
//! - CSV row sinks and input readers
//!
//! ## Architecture
//! - Implements the port traits defined in `bibsync-core`
//! - All externally caused failures are converted into `bibsync-domain`
//!   errors at this boundary

pub mod config;
pub mod errors;
pub mod http;
pub mod input;
pub mod sinks;
pub mod store;
pub mod worldcat;

pub use errors::InfraError;
pub use http::HttpClient;
pub use sinks::{CsvRowSink, SharedSink};
pub use store::DotenvTokenStore;
pub use worldcat::{AuthenticatedClient, TokenAuthority, WorldcatClient};
