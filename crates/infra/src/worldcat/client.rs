//! Authenticated WorldCat Metadata API client
//!
//! [`AuthenticatedClient`] sends bearer-authenticated requests, appending
//! the transaction id when identity is configured, and renews the access
//! token transparently: a 401 on the first attempt is treated as the
//! token-expired signal (the explicit authorization failure, distinguishable
//! from every other HTTP error), after which the renewed credentials are
//! persisted and the request is replayed exactly once. A 401 on the replay
//! surfaces as `Auth` — renewal did not help.
//!
//! [`WorldcatClient`] shapes the three endpoint URLs on top of it and
//! decodes the JSON responses.

use std::sync::Arc;

use async_trait::async_trait;
use bibsync_core::ports::{
    BriefBibSearchResponse, Cascade, ControlNumberCheckResponse, HoldingOperation,
    HoldingUpdateResponse, TokenStore, WorldcatApi,
};
use bibsync_domain::{
    BibsyncError, Credentials, IdentityConfig, Result, TransactionId, WorldcatConfig,
};
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::http::HttpClient;
use crate::worldcat::auth::TokenAuthority;

/// Bearer-authenticated transport with single renew-and-replay semantics.
pub struct AuthenticatedClient {
    http: HttpClient,
    authority: TokenAuthority,
    store: Arc<dyn TokenStore>,
    identity: IdentityConfig,
    credentials: RwLock<Credentials>,
}

impl AuthenticatedClient {
    /// Create a client around credentials loaded from the store.
    pub async fn new(
        http: HttpClient,
        authority: TokenAuthority,
        store: Arc<dyn TokenStore>,
        identity: IdentityConfig,
    ) -> Result<Self> {
        let credentials = store.load().await?;
        Ok(Self { http, authority, store, identity, credentials: RwLock::new(credentials) })
    }

    /// Make an authenticated request, renewing and replaying once on token
    /// expiry. Any 4xx/5xx on the (possibly replayed) response is surfaced
    /// as `Http { status, detail }`; retry policy for those lives in the
    /// drivers.
    pub async fn request(&self, method: Method, url: &str) -> Result<Response> {
        let url = self.with_transaction_id(url)?;

        let first = self.send(method.clone(), url.clone()).await?;
        let response = if first.status() == StatusCode::UNAUTHORIZED {
            debug!(%url, "access token rejected; renewing credentials");
            self.renew_credentials().await?;

            let replayed = self.send(method, url).await?;
            if replayed.status() == StatusCode::UNAUTHORIZED {
                return Err(BibsyncError::Auth(
                    "access token rejected after renewal".into(),
                ));
            }
            replayed
        } else {
            first
        };

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BibsyncError::Http { status: status.as_u16(), detail });
        }

        Ok(response)
    }

    async fn send(&self, method: Method, url: Url) -> Result<Response> {
        let access_token = { self.credentials.read().await.access_token.clone() };
        let builder = self
            .http
            .request(method, url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json");
        self.http.send(builder).await
    }

    /// Renew via the authority and persist the updated credentials before
    /// the replay, so a crash between the two never loses the grant.
    async fn renew_credentials(&self) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        let renewed = self.authority.renew(&credentials).await?;
        *credentials = renewed;
        self.store.persist(&credentials).await?;
        info!("renewed credentials persisted");
        Ok(())
    }

    fn with_transaction_id(&self, url: &str) -> Result<Url> {
        let mut parsed = Url::parse(url)
            .map_err(|err| BibsyncError::Config(format!("invalid API URL '{url}': {err}")))?;

        let transaction_id = TransactionId::generate(
            self.identity.institution_symbol.as_deref(),
            self.identity.principal_id.as_deref(),
            Utc::now(),
        );
        if !transaction_id.is_empty() {
            parsed.query_pairs_mut().append_pair("transactionID", transaction_id.as_str());
        }

        Ok(parsed)
    }
}

/// The three Metadata API operations over an [`AuthenticatedClient`].
pub struct WorldcatClient {
    client: AuthenticatedClient,
    api_base_url: String,
    search_base_url: String,
}

impl WorldcatClient {
    #[must_use]
    pub fn new(client: AuthenticatedClient, config: &WorldcatConfig) -> Self {
        Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            search_base_url: config.search_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|err| BibsyncError::Network(format!("failed to read response: {err}")))?;
        serde_json::from_str(&body).map_err(|err| {
            BibsyncError::MalformedResponse(format!("problem with {context} response: {err}"))
        })
    }
}

#[async_trait]
impl WorldcatApi for WorldcatClient {
    async fn check_control_numbers(
        &self,
        oclc_numbers: &str,
    ) -> Result<ControlNumberCheckResponse> {
        let url = format!(
            "{}/bib/checkcontrolnumbers?oclcNumbers={}",
            self.api_base_url,
            urlencoding::encode(oclc_numbers)
        );
        let response = self.client.request(Method::GET, &url).await?;
        Self::decode(response, "control number check").await
    }

    async fn update_holdings(
        &self,
        operation: HoldingOperation,
        oclc_numbers: &str,
        cascade: Option<Cascade>,
    ) -> Result<HoldingUpdateResponse> {
        let mut url = format!(
            "{}/ih/datalist?oclcNumbers={}",
            self.api_base_url,
            urlencoding::encode(oclc_numbers)
        );
        if let Some(cascade) = cascade {
            url.push_str("&cascade=");
            url.push_str(cascade.as_query_value());
        }

        let method = match operation {
            HoldingOperation::Set => Method::POST,
            HoldingOperation::Unset => Method::DELETE,
        };
        let response = self.client.request(method, &url).await?;
        Self::decode(response, &format!("{} holding", operation.verb())).await
    }

    async fn search_brief_bibs(
        &self,
        query: &str,
        held_by_symbol: Option<&str>,
    ) -> Result<BriefBibSearchResponse> {
        let mut url = format!(
            "{}/brief-bibs?q={}",
            self.search_base_url,
            urlencoding::encode(query)
        );
        if let Some(symbol) = held_by_symbol {
            url.push_str("&heldBySymbol=");
            url.push_str(&urlencoding::encode(symbol));
        }

        let response = self.client.request(Method::GET, &url).await?;
        Self::decode(response, "brief bibliographic resources search").await
    }
}
