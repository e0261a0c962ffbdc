//! OAuth credential state
//!
//! The full credential set for the client-credentials flow: the client
//! key/secret pair plus the current access token and, when one has been
//! granted, the longer-lived refresh token. Loaded at process start, mutated
//! only by the authenticated client after a successful renewal, persisted
//! immediately after mutation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::REFRESH_TOKEN_EXPIRY_MARGIN_SECS;

/// OAuth access and refresh tokens with the client identity they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth client id (the API key).
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Bearer access token for API authentication.
    pub access_token: String,

    /// Token type (always "bearer" in practice).
    pub token_type: String,

    /// Absolute access-token expiration instant (UTC).
    pub access_token_expires_at: DateTime<Utc>,

    /// Refresh token for obtaining new access tokens without the secret.
    /// Absent until a full client-credentials grant has issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute refresh-token expiration instant (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Seconds until the refresh token expires, if one exists with a known
    /// expiry. Negative once expired.
    #[must_use]
    pub fn refresh_token_remaining_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.refresh_token
            .as_ref()
            .and(self.refresh_token_expires_at)
            .map(|expires_at| (expires_at - now).num_seconds())
    }

    /// Whether the refresh token can still be used for a refresh grant.
    ///
    /// True only when a refresh token exists and its remaining lifetime
    /// exceeds the safety margin. A token inside the margin is treated as
    /// already expired so the renewal falls back to a full grant.
    #[must_use]
    pub fn can_use_refresh_token(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token_remaining_secs(now)
            .is_some_and(|remaining| remaining > REFRESH_TOKEN_EXPIRY_MARGIN_SECS)
    }

    /// Whether the access token is expired (or will be within the given
    /// threshold).
    #[must_use]
    pub fn access_token_expired(&self, now: DateTime<Utc>, threshold_seconds: i64) -> bool {
        now + Duration::seconds(threshold_seconds) >= self.access_token_expires_at
    }
}
