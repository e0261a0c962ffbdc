//! Chunked batch driver
//!
//! Drives the holdings-check and set/unset buffers: validates each input
//! row, fills the buffer up to the batch size, processes and clears it, and
//! flushes the final partial batch. Invalid and duplicate rows are recorded
//! in the error bucket without an API call. Unlike the search driver, a
//! malformed response halts the run here: the same batch would fail again.

use bibsync_domain::{CheckRow, HoldingRow, OclcNumber, Result, RunTallies};
use tracing::{debug, error, info, warn};

use crate::buffer::RecordBuffer;
use crate::ports::RowSink;

/// An input row the chunked driver can validate and feed to a buffer.
pub trait BatchRow {
    type Item;

    /// Validate the row and build the buffer item.
    fn to_item(&self) -> Result<Self::Item>;

    /// Identifying fields written ahead of the message in an error row.
    fn error_fields(&self) -> Vec<String>;
}

impl BatchRow for CheckRow {
    type Item = (String, String);

    fn to_item(&self) -> Result<Self::Item> {
        let number = OclcNumber::parse(&self.oclc_num)?;
        Ok((number.into_inner(), self.mms_id.clone()))
    }

    fn error_fields(&self) -> Vec<String> {
        vec![self.mms_id.clone(), self.oclc_num.clone()]
    }
}

impl BatchRow for HoldingRow {
    type Item = String;

    fn to_item(&self) -> Result<Self::Item> {
        Ok(OclcNumber::parse(&self.oclc_num)?.into_inner())
    }

    fn error_fields(&self) -> Vec<String> {
        // Second field keeps the error row aligned with the three-column
        // holding output (requested number, new number, message).
        vec![self.oclc_num.clone(), String::new()]
    }
}

/// Chunked driver over a map/set record buffer.
pub struct ChunkedRunner<B: RecordBuffer> {
    buffer: B,
    batch_size: usize,
    /// Rows: identifying fields, message.
    error_sink: Box<dyn RowSink>,
}

impl<B> ChunkedRunner<B>
where
    B: RecordBuffer + Send,
{
    #[must_use]
    pub fn new(buffer: B, batch_size: usize, error_sink: Box<dyn RowSink>) -> Self {
        Self { buffer, batch_size: batch_size.max(1), error_sink }
    }

    /// Give the buffer back, e.g. to flush its sinks.
    pub fn into_buffer(self) -> B {
        self.buffer
    }

    /// Run the operation over all input rows.
    ///
    /// Returns an error when a batch fails fatally (malformed response, or a
    /// server error that persists through the one retry); rows already
    /// classified keep their buckets.
    pub async fn run<R>(&mut self, rows: &[R], tallies: &mut RunTallies) -> Result<()>
    where
        R: BatchRow<Item = B::Item> + Sync,
    {
        let input_count = rows.len() as u64;

        for row in rows {
            let item = match row.to_item() {
                Ok(item) => item,
                Err(err) => {
                    self.record_row_error(row, &err, tallies)?;
                    continue;
                }
            };

            if self.buffer.len() >= self.batch_size {
                debug!(records = self.buffer.len(), "records buffer is full");
                self.process_with_retry(tallies).await?;
                self.buffer.clear();
            }

            if let Err(err) = self.buffer.add(item) {
                self.record_row_error(row, &err, tallies)?;
            }
        }

        if !self.buffer.is_empty() {
            self.process_with_retry(tallies).await?;
            self.buffer.clear();
        }

        self.error_sink.flush()?;
        info!(
            rows = input_count,
            errors = tallies.errors,
            api_requests = tallies.api_requests,
            "batch run finished"
        );
        tallies.verify_row_count(input_count)
    }

    /// Process the current buffer, retrying once on a server-side failure.
    async fn process_with_retry(&mut self, tallies: &mut RunTallies) -> Result<()> {
        match self.buffer.process(tallies).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_server_error() => {
                warn!(error = %err, "server error; reprocessing this records buffer once");
                self.buffer.process(tallies).await.map_err(|second| {
                    error!(
                        error = %second,
                        "consecutive failures on the same records buffer; halting run"
                    );
                    second
                })
            }
            Err(err) => {
                error!(error = %err, "records buffer processing failed; halting run");
                Err(err)
            }
        }
    }

    fn record_row_error<R>(
        &mut self,
        row: &R,
        err: &bibsync_domain::BibsyncError,
        tallies: &mut RunTallies,
    ) -> Result<()>
    where
        R: BatchRow<Item = B::Item>,
    {
        warn!(error = %err, "skipping input row");
        tallies.errors += 1;
        let mut fields = row.error_fields();
        fields.push(err.to_string());
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        self.error_sink.write_row(&fields)
    }
}
