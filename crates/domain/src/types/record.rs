//! Input row types
//!
//! Rows arrive already parsed from the tabular input layer; these types are
//! what the batch drivers and buffers operate on.

use serde::{Deserialize, Serialize};

/// One row of the holdings-check input: a catalog record key paired with the
/// control number recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRow {
    /// The ILS-side record key (MMS ID).
    pub mms_id: String,
    /// The control number as exported, prior to validation.
    pub oclc_num: String,
}

/// One row of the set/unset-holding input: a bare control number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub oclc_num: String,
}

/// One row of the search input: a record key plus whatever identifiers the
/// catalog export carried for it. `isbn` and `issn` may hold multiple
/// semicolon-separated values; the first is used for searching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRow {
    /// Zero-based position in the input file, for log correlation.
    #[serde(default)]
    pub row_index: usize,
    pub mms_id: String,
    #[serde(default)]
    pub lccn_fixed: Option<String>,
    #[serde(default)]
    pub lccn: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub issn: Option<String>,
    #[serde(default)]
    pub gov_doc_class_num_086: Option<String>,
    #[serde(default)]
    pub gpo_item_num_074: Option<String>,
}
