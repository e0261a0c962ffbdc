//! Aggregate run counters

use serde::{Deserialize, Serialize};

use crate::errors::{BibsyncError, Result};

/// Per-category tallies accumulated over a run.
///
/// Each buffer's process step adds to the categories it owns; the drivers
/// add to `errors` for rows that never reached a buffer. `api_requests`
/// counts remote calls and is not part of the row reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTallies {
    /// Holdings check: records already carrying the current control number.
    pub current: u64,
    /// Holdings check: records whose control number has been superseded.
    pub old: u64,
    /// Set/unset: holdings successfully updated.
    pub updated: u64,
    /// Set/unset: holdings already in the desired state.
    pub no_update_needed: u64,
    /// Search: exactly one match, number resolved.
    pub single_match: u64,
    /// Search: multiple matches, number left unresolved.
    pub multiple_matches: u64,
    /// Rows recorded in an error bucket.
    pub errors: u64,
    /// Remote API requests issued (including the driver's retries).
    pub api_requests: u64,
}

impl RunTallies {
    /// Total rows that landed in an output bucket.
    #[must_use]
    pub fn rows_classified(&self) -> u64 {
        self.current
            + self.old
            + self.updated
            + self.no_update_needed
            + self.single_match
            + self.multiple_matches
            + self.errors
    }

    /// End-of-run consistency check: every input row must have landed in
    /// exactly one bucket.
    pub fn verify_row_count(&self, input_rows: u64) -> Result<()> {
        let classified = self.rows_classified();
        if classified == input_rows {
            Ok(())
        } else {
            Err(BibsyncError::Internal(format!(
                "row tally mismatch: {input_rows} input row(s) but {classified} classified row(s)"
            )))
        }
    }
}
