//! Tabular input readers

mod csv;

pub use self::csv::{read_check_rows, read_holding_rows, read_search_rows};
