//! Identifier-search buffer
//!
//! Holds at most one record at a time. A search uses the first identifier
//! present in priority order: fixed LCCN, raw LCCN, ISBN, ISSN, government
//! document classification number (AND-combined with the GPO item number
//! when both exist). A GPO item number alone is not searchable.
//!
//! Zero matches is a failure surfaced to the driver; one match resolves the
//! number; more than one marks the row as ambiguous without resolving it.

use std::sync::Arc;

use async_trait::async_trait;
use bibsync_domain::{BibsyncError, Result, RunTallies, SearchRow};
use tracing::debug;

use crate::buffer::RecordBuffer;
use crate::ports::{RowSink, WorldcatApi};

/// Search index labels of the brief-bib query grammar.
const INDEX_LCCN: &str = "nl";
const INDEX_ISBN: &str = "bn";
const INDEX_ISSN: &str = "in";
const INDEX_GOV_DOC_CLASS: &str = "gd";
const INDEX_GPO_ITEM: &str = "gi";

/// Output sinks for the search operation. The error bucket belongs to the
/// driver, which also records failures that never reach the buffer.
pub struct SearchSinks {
    /// Rows: record key, resolved number.
    pub matched: Box<dyn RowSink>,
    /// Rows: record key, match count.
    pub ambiguous: Box<dyn RowSink>,
}

/// Single-record buffer for one brief-bib search.
pub struct SearchBuffer {
    /// Invariant: length is 0 or 1 at all times, enforced at `add` and
    /// defensively at `process`.
    slot: Vec<SearchRow>,
    /// Apply the held-by filter to the search.
    held_by_first: bool,
    institution_symbol: Option<String>,
    api: Arc<dyn WorldcatApi>,
    sinks: SearchSinks,
}

impl SearchBuffer {
    #[must_use]
    pub fn new(
        api: Arc<dyn WorldcatApi>,
        sinks: SearchSinks,
        held_by_first: bool,
        institution_symbol: Option<String>,
    ) -> Self {
        Self { slot: Vec::new(), held_by_first, institution_symbol, api, sinks }
    }

    /// Flush both sinks.
    pub fn flush_sinks(&mut self) -> Result<()> {
        self.sinks.matched.flush()?;
        self.sinks.ambiguous.flush()
    }

    /// Build the search query from the first identifier present.
    fn build_query(row: &SearchRow) -> Result<String> {
        if let Some(lccn) = first_value(&row.lccn_fixed) {
            return Ok(format!("{INDEX_LCCN}:{lccn}"));
        }
        if let Some(lccn) = first_value(&row.lccn) {
            return Ok(format!("{INDEX_LCCN}:{lccn}"));
        }
        if let Some(isbn) = first_value(&row.isbn) {
            return Ok(format!("{INDEX_ISBN}:{isbn}"));
        }
        if let Some(issn) = first_value(&row.issn) {
            return Ok(format!("{INDEX_ISSN}:{issn}"));
        }
        if let Some(class_num) = first_value(&row.gov_doc_class_num_086) {
            return Ok(match first_value(&row.gpo_item_num_074) {
                Some(item_num) => format!(
                    "{INDEX_GOV_DOC_CLASS}:{class_num} AND {INDEX_GPO_ITEM}:{item_num}"
                ),
                None => format!("{INDEX_GOV_DOC_CLASS}:{class_num}"),
            });
        }

        Err(BibsyncError::InvalidInput(format!(
            "record with MMS ID {} has no searchable identifier",
            row.mms_id
        )))
    }
}

#[async_trait]
impl RecordBuffer for SearchBuffer {
    type Item = SearchRow;

    fn add(&mut self, row: Self::Item) -> Result<()> {
        if !self.slot.is_empty() {
            return Err(BibsyncError::Precondition(format!(
                "cannot add to a non-empty search buffer (currently contains {} record(s))",
                self.slot.len()
            )));
        }
        debug!(mms_id = %row.mms_id, row = row.row_index, "added record to buffer");
        self.slot.push(row);
        Ok(())
    }

    async fn process(&mut self, tallies: &mut RunTallies) -> Result<()> {
        // The caller enforces this at add time as well; a wrongly sized
        // buffer here means the add/clear discipline was broken.
        if self.slot.len() != 1 {
            return Err(BibsyncError::Precondition(format!(
                "search buffer must contain exactly one record but contains {}",
                self.slot.len()
            )));
        }
        let row = &self.slot[0];

        let query = Self::build_query(row)?;
        let held_by = if self.held_by_first { self.institution_symbol.as_deref() } else { None };
        debug!(mms_id = %row.mms_id, %query, held_by = held_by.unwrap_or(""), "searching");

        let response = self.api.search_brief_bibs(&query, held_by).await?;
        tallies.api_requests += 1;

        match response.number_of_records {
            0 => Err(BibsyncError::NotFound(format!(
                "no WorldCat records matched query '{query}'"
            ))),
            1 => {
                let oclc_num = response
                    .brief_records
                    .first()
                    .map(|record| record.oclc_number.as_str())
                    .ok_or_else(|| {
                        BibsyncError::MalformedResponse(
                            "search response reported one record but carried none".into(),
                        )
                    })?;
                debug!(mms_id = %row.mms_id, oclc_num, "resolved control number");
                tallies.single_match += 1;
                self.sinks.matched.write_row(&[&row.mms_id, oclc_num])?;
                self.flush_sinks()
            }
            matches => {
                debug!(mms_id = %row.mms_id, matches, "multiple matches");
                tallies.multiple_matches += 1;
                let matches = matches.to_string();
                self.sinks.ambiguous.write_row(&[&row.mms_id, &matches])?;
                self.flush_sinks()
            }
        }
    }

    fn clear(&mut self) {
        self.slot.clear();
        debug!("cleared records buffer");
    }

    fn len(&self) -> usize {
        self.slot.len()
    }
}

/// First non-empty value of a possibly semicolon-separated field.
fn first_value(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .and_then(|value| value.split(';').map(str::trim).find(|part| !part.is_empty()))
}
