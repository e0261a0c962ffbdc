//! Batch drivers
//!
//! The runners own the row loop and the retry policy: a server-side (5xx)
//! failure of a buffer's process step is retried exactly once on the same
//! unprocessed buffer state; a second consecutive failure aborts the whole
//! run. A repeat failure on identical input is treated as a systemic outage,
//! not a per-record fluke.

pub mod chunked;
pub mod search;
