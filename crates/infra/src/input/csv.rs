//! CSV input readers
//!
//! Input files are headered CSV. Column names follow the catalog-export
//! conventions: `mms_id`, `oclc_num`, and for search inputs the identifier
//! columns `lccn_fixed`, `lccn`, `isbn`, `issn`, `gov_doc_class_num_086`,
//! `gpo_item_num_074`. Empty identifier cells become `None`.

use std::path::Path;

use bibsync_domain::{BibsyncError, CheckRow, HoldingRow, Result, SearchRow};
use serde::Deserialize;

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::Reader::from_path(path).map_err(|err| {
        BibsyncError::InvalidInput(format!(
            "failed to open input file {}: {err}",
            path.display()
        ))
    })
}

fn row_error(path: &Path, index: usize, err: &csv::Error) -> BibsyncError {
    BibsyncError::InvalidInput(format!(
        "invalid row {} in input file {}: {err}",
        index + 2, // header row + one-based numbering
        path.display()
    ))
}

/// Read holdings-check input rows (`mms_id`, `oclc_num`).
pub fn read_check_rows(path: impl AsRef<Path>) -> Result<Vec<CheckRow>> {
    let path = path.as_ref();
    let mut rows = Vec::new();
    for (index, record) in reader(path)?.deserialize::<CheckRow>().enumerate() {
        rows.push(record.map_err(|err| row_error(path, index, &err))?);
    }
    Ok(rows)
}

/// Read set/unset input rows (`oclc_num`).
pub fn read_holding_rows(path: impl AsRef<Path>) -> Result<Vec<HoldingRow>> {
    let path = path.as_ref();
    let mut rows = Vec::new();
    for (index, record) in reader(path)?.deserialize::<HoldingRow>().enumerate() {
        rows.push(record.map_err(|err| row_error(path, index, &err))?);
    }
    Ok(rows)
}

/// Raw search row as it appears in the file; all identifier columns
/// optional.
#[derive(Debug, Deserialize)]
struct SearchCsvRow {
    mms_id: String,
    #[serde(default)]
    lccn_fixed: Option<String>,
    #[serde(default)]
    lccn: Option<String>,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    issn: Option<String>,
    #[serde(default)]
    gov_doc_class_num_086: Option<String>,
    #[serde(default)]
    gpo_item_num_074: Option<String>,
}

/// Read search input rows, numbering them by file position.
pub fn read_search_rows(path: impl AsRef<Path>) -> Result<Vec<SearchRow>> {
    let path = path.as_ref();
    let mut rows = Vec::new();
    for (index, record) in reader(path)?.deserialize::<SearchCsvRow>().enumerate() {
        let raw = record.map_err(|err| row_error(path, index, &err))?;
        rows.push(SearchRow {
            row_index: index,
            mms_id: raw.mms_id,
            lccn_fixed: non_empty(raw.lccn_fixed),
            lccn: non_empty(raw.lccn),
            isbn: non_empty(raw.isbn),
            issn: non_empty(raw.issn),
            gov_doc_class_num_086: non_empty(raw.gov_doc_class_num_086),
            gpo_item_num_074: non_empty(raw.gpo_item_num_074),
        });
    }
    Ok(rows)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
