//! Domain data types

pub mod credentials;
pub mod identifier;
pub mod record;
pub mod results;
pub mod transaction;

pub use credentials::Credentials;
pub use identifier::OclcNumber;
pub use record::{CheckRow, HoldingRow, SearchRow};
pub use results::RunTallies;
pub use transaction::TransactionId;
