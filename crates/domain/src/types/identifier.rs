//! OCLC control number validation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{BibsyncError, Result};

/// Organization code sometimes prefixed to control numbers in 035 fields.
const ORG_CODE_PREFIX: &str = "(OCoLC)";

/// Control number prefixes accepted in catalog exports. `|a` appears in
/// records whose subfield delimiter survived the export.
const VALID_PREFIXES: [&str; 4] = ["ocm", "ocn", "on", "|a"];

/// A validated, normalized OCLC control number.
///
/// Accepts an optional `(OCoLC)` org-code prefix and the prefixes `ocm`,
/// `ocn`, `on`, and `|a`; tolerates a single trailing `#`; strips leading
/// zeros. Anything else is rejected with a descriptive `InvalidInput` error
/// so the offending row can be reported without an API call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OclcNumber(String);

impl OclcNumber {
    /// Validate and normalize a raw control number string.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BibsyncError::InvalidInput("OCLC number is empty".into()));
        }

        let rest = trimmed.strip_prefix(ORG_CODE_PREFIX).unwrap_or(trimmed).trim_start();

        let Some(digits_start) = rest.find(|c: char| c.is_ascii_digit()) else {
            return Err(BibsyncError::InvalidInput(format!(
                "OCLC number '{trimmed}' contains no digits"
            )));
        };

        let (prefix, number) = rest.split_at(digits_start);
        if !prefix.is_empty() && !VALID_PREFIXES.contains(&prefix) {
            return Err(BibsyncError::InvalidInput(format!(
                "'{prefix}' is not a valid OCLC number prefix (expected one of: {})",
                VALID_PREFIXES.join(", ")
            )));
        }

        // A single trailing '#' is a known export artifact.
        let number = number.strip_suffix('#').unwrap_or(number);
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BibsyncError::InvalidInput(format!(
                "OCLC number '{trimmed}' contains at least one non-digit character"
            )));
        }

        let normalized = number.trim_start_matches('0');
        let normalized = if normalized.is_empty() { "0" } else { normalized };
        Ok(Self(normalized.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OclcNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
