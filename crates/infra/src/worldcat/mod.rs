//! WorldCat Metadata API integration
//!
//! `auth` handles grants against the authorization server; `client` wraps
//! the transport with transparent token renewal and implements the
//! `WorldcatApi` port for the three remote operations.

pub mod auth;
pub mod client;

pub use auth::TokenAuthority;
pub use client::{AuthenticatedClient, WorldcatClient};
