//! Row sinks

mod csv;
mod shared;

pub use self::csv::CsvRowSink;
pub use self::shared::SharedSink;
