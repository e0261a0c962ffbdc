//! Token grants against the OAuth authorization server
//!
//! Two paths: a refresh-token grant while the stored refresh token is still
//! inside its usable window, and a full client-credentials grant otherwise.
//! The full grant also yields a fresh refresh token. Relative `expires_in`
//! lifetimes from the server are converted to absolute UTC instants at
//! grant time.

use bibsync_domain::constants::{EXPECTED_EPOCH, STORED_EXPIRY_FORMAT, TOKEN_GRANT_SCOPE};
use bibsync_domain::{BibsyncError, Credentials, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::HttpClient;

/// Token response from the authorization server (RFC 6749 §5.1, plus the
/// vendor's refresh-token expiry field).
#[derive(Debug, Deserialize)]
struct TokenGrantResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_token_expires_in: Option<i64>,
}

/// Error response from the authorization server (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct TokenGrantError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Issues token grants for the WorldCat Metadata API.
pub struct TokenAuthority {
    http: HttpClient,
    token_url: String,
}

impl TokenAuthority {
    #[must_use]
    pub fn new(http: HttpClient, token_url: String) -> Self {
        Self { http, token_url }
    }

    /// Renew the given credentials, choosing the grant path by the state of
    /// the refresh token.
    ///
    /// Access-token fields are always replaced. Refresh-token fields are
    /// replaced only on the full grant path; the refresh grant keeps the
    /// existing refresh token and expiry.
    pub async fn renew(&self, current: &Credentials) -> Result<Credentials> {
        check_epoch();

        let now = Utc::now();
        if current.can_use_refresh_token(now) {
            debug!(
                remaining_secs = current.refresh_token_remaining_secs(now),
                "renewing access token via refresh-token grant"
            );
            self.refresh_grant(current).await
        } else {
            debug!("refresh token absent or expiring; requesting full client-credentials grant");
            self.full_grant(current).await
        }
    }

    async fn refresh_grant(&self, current: &Credentials) -> Result<Credentials> {
        let Some(refresh_token) = current.refresh_token.as_deref() else {
            return Err(BibsyncError::Auth("no refresh token available".into()));
        };

        let params =
            [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let grant = self.request_grant(current, &params).await?;

        Ok(Credentials {
            client_id: current.client_id.clone(),
            client_secret: current.client_secret.clone(),
            access_token: grant.access_token,
            token_type: grant.token_type,
            access_token_expires_at: Utc::now() + Duration::seconds(grant.expires_in),
            refresh_token: current.refresh_token.clone(),
            refresh_token_expires_at: current.refresh_token_expires_at,
        })
    }

    async fn full_grant(&self, current: &Credentials) -> Result<Credentials> {
        let params = [("grant_type", "client_credentials"), ("scope", TOKEN_GRANT_SCOPE)];
        let grant = self.request_grant(current, &params).await?;

        if grant.refresh_token.is_none() {
            warn!("client-credentials grant did not include a refresh token");
        }

        let now = Utc::now();
        Ok(Credentials {
            client_id: current.client_id.clone(),
            client_secret: current.client_secret.clone(),
            access_token: grant.access_token,
            token_type: grant.token_type,
            access_token_expires_at: now + Duration::seconds(grant.expires_in),
            refresh_token: grant.refresh_token,
            refresh_token_expires_at: grant
                .refresh_token_expires_in
                .map(|secs| now + Duration::seconds(secs)),
        })
    }

    async fn request_grant(
        &self,
        current: &Credentials,
        params: &[(&str, &str)],
    ) -> Result<TokenGrantResponse> {
        let builder = self
            .http
            .request(Method::POST, &self.token_url)
            .basic_auth(&current.client_id, Some(&current.client_secret))
            .form(params);

        let response = self.http.send(builder).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BibsyncError::Auth(format!("failed to read token response: {err}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenGrantError>(&body)
                .map(|err| match err.error_description {
                    Some(description) => format!("{}: {description}", err.error),
                    None => err.error,
                })
                .unwrap_or_else(|_| body.clone());
            return Err(BibsyncError::Auth(format!(
                "token endpoint rejected the grant (HTTP {}): {detail}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|err| BibsyncError::Auth(format!("unparseable token response: {err}")))
    }
}

/// Diagnostic only: confirm the local clock's epoch is the Unix epoch.
/// Renewal proceeds regardless, but refresh-window arithmetic would be
/// suspect on a system where this fails.
fn check_epoch() {
    let system_epoch = DateTime::<Utc>::from_timestamp(0, 0)
        .map(|epoch| epoch.format(STORED_EXPIRY_FORMAT).to_string());

    match system_epoch {
        Some(epoch) if epoch == EXPECTED_EPOCH => {}
        Some(epoch) => warn!(
            system_epoch = %epoch,
            expected_epoch = EXPECTED_EPOCH,
            "system epoch differs from the expected epoch; refresh-token expiry \
             comparisons may be unreliable"
        ),
        None => warn!("could not determine the system epoch"),
    }
}
