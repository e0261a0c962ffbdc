//! Holdings-check buffer
//!
//! Batches original control number → record key pairs and asks the API
//! which numbers are still current. Classification per entry:
//! - not found: error bucket
//! - found, not merged: current bucket (record key, current number)
//! - found, merged: old bucket (record key, current number, original number)

use std::sync::Arc;

use async_trait::async_trait;
use bibsync_domain::{BibsyncError, Result, RunTallies};
use indexmap::IndexMap;
use tracing::debug;

use crate::buffer::{join_numbers, RecordBuffer};
use crate::ports::{RowSink, WorldcatApi};

/// Output sinks for the holdings-check operation, one per bucket.
pub struct HoldingsCheckSinks {
    /// Rows: record key, current number.
    pub current: Box<dyn RowSink>,
    /// Rows: record key, current number, original number.
    pub old: Box<dyn RowSink>,
    /// Rows: record key, requested number, message.
    pub errors: Box<dyn RowSink>,
}

/// Buffer of original-number → record-key pairs for one check request.
pub struct HoldingsCheckBuffer {
    /// Original control number → owning record key. Insertion-ordered so the
    /// joined request is deterministic.
    numbers: IndexMap<String, String>,
    api: Arc<dyn WorldcatApi>,
    sinks: HoldingsCheckSinks,
}

impl HoldingsCheckBuffer {
    #[must_use]
    pub fn new(api: Arc<dyn WorldcatApi>, sinks: HoldingsCheckSinks) -> Self {
        Self { numbers: IndexMap::new(), api, sinks }
    }

    /// Flush all three sinks.
    pub fn flush_sinks(&mut self) -> Result<()> {
        self.sinks.current.flush()?;
        self.sinks.old.flush()?;
        self.sinks.errors.flush()
    }
}

#[async_trait]
impl RecordBuffer for HoldingsCheckBuffer {
    /// (original control number, record key)
    type Item = (String, String);

    fn add(&mut self, (oclc_num, mms_id): Self::Item) -> Result<()> {
        if let Some(existing) = self.numbers.get(&oclc_num) {
            return Err(BibsyncError::Precondition(format!(
                "OCLC number {oclc_num} already exists in records buffer with MMS ID {existing}"
            )));
        }
        debug!(%oclc_num, %mms_id, "added record to buffer");
        self.numbers.insert(oclc_num, mms_id);
        Ok(())
    }

    async fn process(&mut self, tallies: &mut RunTallies) -> Result<()> {
        let joined = join_numbers(self.numbers.keys());
        debug!(records = self.numbers.len(), "checking control numbers");

        let response = self.api.check_control_numbers(&joined).await?;
        tallies.api_requests += 1;

        for entry in &response.entry {
            let requested = entry.requested_oclc_number.as_str();
            let Some(mms_id) = self.numbers.get(requested) else {
                return Err(BibsyncError::MalformedResponse(format!(
                    "control number check returned entry for unrequested number {requested}"
                )));
            };

            if !entry.found {
                tallies.errors += 1;
                self.sinks.errors.write_row(&[
                    mms_id,
                    requested,
                    "Control number not found in WorldCat",
                ])?;
            } else if !entry.merged {
                tallies.current += 1;
                self.sinks.current.write_row(&[mms_id, &entry.current_oclc_number])?;
            } else {
                tallies.old += 1;
                self.sinks.old.write_row(&[mms_id, &entry.current_oclc_number, requested])?;
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
