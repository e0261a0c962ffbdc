//! Conversions from external infrastructure errors into domain errors.

use bibsync_domain::BibsyncError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BibsyncError);

impl From<InfraError> for BibsyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BibsyncError> for InfraError {
    fn from(value: BibsyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBibsyncError {
    fn into_bibsync(self) -> BibsyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BibsyncError */
/* -------------------------------------------------------------------------- */

impl IntoBibsyncError for HttpError {
    fn into_bibsync(self) -> BibsyncError {
        if self.is_timeout() {
            return BibsyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BibsyncError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return BibsyncError::MalformedResponse(self.to_string());
        }

        if self.is_builder() || self.is_request() {
            return BibsyncError::Internal(format!("failed to build HTTP request: {self}"));
        }

        BibsyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bibsync())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → BibsyncError */
/* -------------------------------------------------------------------------- */

impl IntoBibsyncError for std::io::Error {
    fn into_bibsync(self) -> BibsyncError {
        BibsyncError::Storage(self.to_string())
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_bibsync())
    }
}

/* -------------------------------------------------------------------------- */
/* csv::Error → BibsyncError */
/* -------------------------------------------------------------------------- */

impl IntoBibsyncError for csv::Error {
    fn into_bibsync(self) -> BibsyncError {
        BibsyncError::Storage(format!("CSV error: {self}"))
    }
}

impl From<csv::Error> for InfraError {
    fn from(value: csv::Error) -> Self {
        InfraError(value.into_bibsync())
    }
}
