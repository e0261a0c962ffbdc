//! CSV row sink
//!
//! One sink per classification bucket. The header row is written lazily on
//! the first data row, so an untouched bucket leaves an empty file rather
//! than a header-only one.

use std::fs::File;
use std::path::{Path, PathBuf};

use bibsync_core::ports::RowSink;
use bibsync_domain::{BibsyncError, Result};

use crate::errors::InfraError;

/// Append-only CSV writer with a lazy header.
pub struct CsvRowSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    header: Vec<String>,
    header_written: bool,
}

impl CsvRowSink {
    /// Create (truncating) the output file. Existing files are overwritten,
    /// matching the run-replaces-previous-output contract.
    pub fn create(path: impl AsRef<Path>, header: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|err| {
            BibsyncError::Storage(format!(
                "failed to create output file {}: {err}",
                path.display()
            ))
        })?;

        Ok(Self {
            writer: csv::Writer::from_writer(file),
            path,
            header: header.iter().map(ToString::to_string).collect(),
            header_written: false,
        })
    }
}

impl RowSink for CsvRowSink {
    fn write_row(&mut self, fields: &[&str]) -> Result<()> {
        if !self.header_written {
            self.writer
                .write_record(&self.header)
                .map_err(|err| BibsyncError::from(InfraError::from(err)))?;
            self.header_written = true;
        }
        self.writer
            .write_record(fields)
            .map_err(|err| BibsyncError::from(InfraError::from(err)))
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|err| {
            BibsyncError::Storage(format!(
                "failed to flush output file {}: {err}",
                self.path.display()
            ))
        })
    }
}
