//! Request-correlation transaction ids

use chrono::{DateTime, Utc};

use crate::constants::TRANSACTION_ID_TIMESTAMP_FORMAT;

/// Opaque correlation string attached to outgoing API calls.
///
/// Shape: `{institution_symbol}_{UTC timestamp}_{principal_id}`, with either
/// end omitted when the corresponding identity value is not configured.
/// Empty when neither is configured. Generated fresh per request, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId(String);

impl TransactionId {
    /// Build a transaction id from the configured identity values.
    #[must_use]
    pub fn generate(
        institution_symbol: Option<&str>,
        principal_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        if institution_symbol.is_none() && principal_id.is_none() {
            return Self(String::new());
        }

        let mut id = String::new();
        if let Some(symbol) = institution_symbol {
            id.push_str(symbol);
            if !id.is_empty() {
                id.push('_');
            }
        }
        id.push_str(&now.format(TRANSACTION_ID_TIMESTAMP_FORMAT).to_string());
        if let Some(principal) = principal_id {
            id.push('_');
            id.push_str(principal);
        }

        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).single().expect("valid timestamp")
    }

    #[test]
    fn both_identity_values_present() {
        let id = TransactionId::generate(Some("ZYU"), Some("principal-1"), fixed_now());
        assert_eq!(id.as_str(), "ZYU_2024-03-15T10:30:00Z_principal-1");
    }

    #[test]
    fn symbol_only() {
        let id = TransactionId::generate(Some("ZYU"), None, fixed_now());
        assert_eq!(id.as_str(), "ZYU_2024-03-15T10:30:00Z");
    }

    #[test]
    fn principal_only() {
        let id = TransactionId::generate(None, Some("principal-1"), fixed_now());
        assert_eq!(id.as_str(), "2024-03-15T10:30:00Z_principal-1");
    }

    #[test]
    fn neither_yields_empty() {
        let id = TransactionId::generate(None, None, fixed_now());
        assert!(id.is_empty());
        assert_eq!(id.as_str(), "");
    }
}
