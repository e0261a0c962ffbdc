//! Credential storage

mod dotenv;

pub use dotenv::DotenvTokenStore;
