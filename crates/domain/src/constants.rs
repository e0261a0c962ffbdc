//! Domain constants

/// Safety margin, in seconds, subtracted from the refresh token's remaining
/// lifetime before it is considered usable. Guards against the token expiring
/// while the refresh request is in flight.
pub const REFRESH_TOKEN_EXPIRY_MARGIN_SECS: i64 = 25;

/// The expected rendering of Unix timestamp zero. Renewal logs a warning if
/// the local clock's epoch renders differently.
pub const EXPECTED_EPOCH: &str = "1970-01-01 00:00:00Z";

/// Timestamp format used for refresh-token expiries in the credential store.
/// ISO 8601, except a space replaces the `T` separator.
pub const STORED_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Timestamp format embedded in transaction ids.
pub const TRANSACTION_ID_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Maximum number of identifiers sent in one batched API request unless
/// configured otherwise. The remote API caps one request at 50 numbers.
pub const DEFAULT_MAX_RECORDS_PER_REQUEST: usize = 50;

/// OAuth scope requested on a full client-credentials grant. Includes
/// `refresh_token` so the authorization server issues one alongside the
/// access token.
pub const TOKEN_GRANT_SCOPE: &str = "WorldCatMetadataAPI refresh_token";
