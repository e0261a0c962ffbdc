//! Search driver
//!
//! Processes input rows one at a time through the single-record search
//! buffer. Every row lands in exactly one bucket: matched, ambiguous, or the
//! error bucket owned by this driver. Only consecutive server failures on
//! the same row halt the run.

use std::collections::HashSet;

use bibsync_domain::{BibsyncError, Result, RunTallies, SearchRow};
use tracing::{debug, error, info, warn};

use crate::buffer::search::SearchBuffer;
use crate::buffer::RecordBuffer;
use crate::ports::RowSink;

/// Outcome of one row, as seen by the loop.
enum RowStatus {
    Completed,
    /// The row failed; the error is recorded and the run continues.
    Failed(BibsyncError),
}

/// Per-row driver for the identifier-search operation.
pub struct SearchRunner {
    buffer: SearchBuffer,
    /// Rows: record key, message.
    error_sink: Box<dyn RowSink>,
}

impl SearchRunner {
    #[must_use]
    pub fn new(buffer: SearchBuffer, error_sink: Box<dyn RowSink>) -> Self {
        Self { buffer, error_sink }
    }

    /// Run the search over all input rows.
    ///
    /// Returns an error only when the run is aborted (two consecutive server
    /// failures on the same row) or the end-of-run reconciliation fails;
    /// per-row failures are recorded in the error bucket and the loop
    /// continues. Rows completed before an abort keep their buckets.
    pub async fn run(&mut self, rows: Vec<SearchRow>, tallies: &mut RunTallies) -> Result<()> {
        let input_count = rows.len() as u64;
        let mut seen_keys = HashSet::new();

        for row in rows {
            let mms_id = row.mms_id.clone();
            debug!(%mms_id, row = row.row_index, "processing input row");

            let status = self.process_row(row, &mut seen_keys, tallies).await;
            self.buffer.clear();

            match status {
                Ok(RowStatus::Completed) => {}
                Ok(RowStatus::Failed(err)) => {
                    error!(%mms_id, error = %err, "recording row failure");
                    tallies.errors += 1;
                    self.error_sink.write_row(&[&mms_id, &err.to_string()])?;
                }
                Err(fatal) => {
                    error!(
                        %mms_id,
                        error = %fatal,
                        "consecutive failures on the same records buffer; halting run"
                    );
                    self.error_sink.flush()?;
                    return Err(fatal);
                }
            }
        }

        self.error_sink.flush()?;
        self.buffer.flush_sinks()?;
        info!(
            single_match = tallies.single_match,
            multiple_matches = tallies.multiple_matches,
            errors = tallies.errors,
            api_requests = tallies.api_requests,
            "search run finished"
        );
        tallies.verify_row_count(input_count)
    }

    /// Process one row. `Err` means the run must abort; recoverable failures
    /// come back as `RowStatus::Failed`.
    async fn process_row(
        &mut self,
        row: SearchRow,
        seen_keys: &mut HashSet<String>,
        tallies: &mut RunTallies,
    ) -> Result<RowStatus> {
        if !seen_keys.insert(row.mms_id.clone()) {
            return Ok(RowStatus::Failed(BibsyncError::Precondition(format!(
                "record with MMS ID {} has already been processed",
                row.mms_id
            ))));
        }

        if !self.buffer.is_empty() {
            return Ok(RowStatus::Failed(BibsyncError::Precondition(format!(
                "records buffer was not properly emptied (contains {} record(s))",
                self.buffer.len()
            ))));
        }

        if let Err(err) = self.buffer.add(row) {
            return Ok(RowStatus::Failed(err));
        }

        match self.buffer.process(tallies).await {
            Ok(()) => Ok(RowStatus::Completed),
            Err(err) if err.is_server_error() => {
                warn!(error = %err, "server error; reprocessing this records buffer once");
                match self.buffer.process(tallies).await {
                    Ok(()) => Ok(RowStatus::Completed),
                    // The retry is the last word: any failure here aborts.
                    Err(second) => Err(second),
                }
            }
            Err(err) => Ok(RowStatus::Failed(err)),
        }
    }
}
