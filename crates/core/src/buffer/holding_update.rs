//! Set/unset-holding buffer
//!
//! Batches a set of control numbers and applies one holding operation to all
//! of them. Classification keys on the per-entry embedded status string:
//! `HTTP 200 OK` → updated, `HTTP 409 Conflict` → already in the desired
//! state, anything else → error. Output rows follow response entry order,
//! which is not guaranteed to match request order.

use std::sync::Arc;

use async_trait::async_trait;
use bibsync_domain::{BibsyncError, Result, RunTallies};
use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::buffer::{join_numbers, RecordBuffer};
use crate::ports::{Cascade, HoldingOperation, RowSink, WorldcatApi};

/// Embedded per-record status values with classification significance.
const STATUS_OK: &str = "HTTP 200 OK";
const STATUS_CONFLICT: &str = "HTTP 409 Conflict";

/// Output sinks for the set/unset operation, one per bucket.
pub struct HoldingUpdateSinks {
    /// Rows: requested number, new number (if changed), warning.
    pub updated: Box<dyn RowSink>,
    /// Rows: requested number, new number (if changed), detail.
    pub no_update_needed: Box<dyn RowSink>,
    /// Rows: requested number, new number (if changed), message.
    pub errors: Box<dyn RowSink>,
}

/// Buffer of control numbers for one set or unset request.
pub struct HoldingUpdateBuffer {
    numbers: IndexSet<String>,
    operation: HoldingOperation,
    /// Applied to unset only; ignored for set.
    cascade: Cascade,
    api: Arc<dyn WorldcatApi>,
    sinks: HoldingUpdateSinks,
}

impl HoldingUpdateBuffer {
    #[must_use]
    pub fn new(
        api: Arc<dyn WorldcatApi>,
        operation: HoldingOperation,
        cascade: Cascade,
        sinks: HoldingUpdateSinks,
    ) -> Self {
        Self { numbers: IndexSet::new(), operation, cascade, api, sinks }
    }

    /// Flush all three sinks.
    pub fn flush_sinks(&mut self) -> Result<()> {
        self.sinks.updated.flush()?;
        self.sinks.no_update_needed.flush()?;
        self.sinks.errors.flush()
    }

    /// Warning text attached when the API reports the number was superseded.
    fn superseded_warning(requested: &str, current: &str) -> String {
        format!(
            "Warning: OCLC number {requested} has been updated to {current}. \
             Consider updating the catalog record."
        )
    }
}

#[async_trait]
impl RecordBuffer for HoldingUpdateBuffer {
    /// A control number.
    type Item = String;

    fn add(&mut self, oclc_num: Self::Item) -> Result<()> {
        if self.numbers.contains(&oclc_num) {
            return Err(BibsyncError::Precondition(format!(
                "OCLC number {oclc_num} already exists in records buffer"
            )));
        }
        debug!(%oclc_num, "added record to buffer");
        self.numbers.insert(oclc_num);
        Ok(())
    }

    async fn process(&mut self, tallies: &mut RunTallies) -> Result<()> {
        let joined = join_numbers(self.numbers.iter());
        let cascade = match self.operation {
            HoldingOperation::Set => None,
            HoldingOperation::Unset => Some(self.cascade),
        };
        debug!(
            records = self.numbers.len(),
            operation = self.operation.verb(),
            "updating holdings"
        );

        let response = self.api.update_holdings(self.operation, &joined, cascade).await?;
        tallies.api_requests += 1;

        for entry in &response.entry {
            let requested = entry.requested_oclc_number.as_str();
            let superseded = !entry.current_oclc_number.is_empty()
                && entry.current_oclc_number != entry.requested_oclc_number;

            let (new_number, warning) = if superseded {
                let warning =
                    Self::superseded_warning(requested, &entry.current_oclc_number);
                warn!(
                    requested,
                    current = %entry.current_oclc_number,
                    "control number superseded"
                );
                (entry.current_oclc_number.as_str(), warning)
            } else {
                ("", String::new())
            };

            match entry.http_status_code.as_str() {
                STATUS_OK => {
                    tallies.updated += 1;
                    self.sinks.updated.write_row(&[requested, new_number, &warning])?;
                }
                STATUS_CONFLICT => {
                    tallies.no_update_needed += 1;
                    let detail = join_detail(&entry.error_detail, &warning);
                    self.sinks.no_update_needed.write_row(&[requested, new_number, &detail])?;
                }
                other => {
                    tallies.errors += 1;
                    let message =
                        join_detail(&format!("{other}: {}", entry.error_detail), &warning);
                    self.sinks.errors.write_row(&[requested, new_number, &message])?;
                }
            }
        }

        self.flush_sinks()
    }

    fn clear(&mut self) {
        self.numbers.clear();
        debug!("cleared records buffer");
    }

    fn len(&self) -> usize {
        self.numbers.len()
    }
}

/// Append the superseded-number warning to a detail message when present.
fn join_detail(detail: &str, warning: &str) -> String {
    if warning.is_empty() {
        detail.to_string()
    } else {
        format!("{detail}. {warning}")
    }
}
