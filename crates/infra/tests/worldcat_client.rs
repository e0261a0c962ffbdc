//! Token renewal and request lifecycle against a mock HTTP server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bibsync_core::ports::{Cascade, HoldingOperation, TokenStore, WorldcatApi};
use bibsync_domain::{
    BibsyncError, Credentials, IdentityConfig, Result, WorldcatConfig,
};
use bibsync_infra::{AuthenticatedClient, HttpClient, TokenAuthority, WorldcatClient};
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory token store recording every persist call.
struct MemoryStore {
    current: Mutex<Credentials>,
    persisted: Mutex<Vec<Credentials>>,
}

impl MemoryStore {
    fn new(credentials: Credentials) -> Arc<Self> {
        Arc::new(Self { current: Mutex::new(credentials), persisted: Mutex::new(Vec::new()) })
    }

    fn persisted(&self) -> Vec<Credentials> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self) -> Result<Credentials> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn persist(&self, credentials: &Credentials) -> Result<()> {
        *self.current.lock().unwrap() = credentials.clone();
        self.persisted.lock().unwrap().push(credentials.clone());
        Ok(())
    }
}

fn expired_credentials(refresh_secs_remaining: Option<i64>) -> Credentials {
    let now = Utc::now();
    Credentials {
        client_id: "key".into(),
        client_secret: "secret".into(),
        access_token: "tk_expired".into(),
        token_type: "bearer".into(),
        access_token_expires_at: now - Duration::seconds(60),
        refresh_token: refresh_secs_remaining.map(|_| "rt_old".to_string()),
        refresh_token_expires_at: refresh_secs_remaining
            .map(|secs| now + Duration::seconds(secs)),
    }
}

async fn client_against(
    server: &MockServer,
    store: Arc<MemoryStore>,
    identity: IdentityConfig,
) -> WorldcatClient {
    let http = HttpClient::new().expect("http client");
    let authority = TokenAuthority::new(http.clone(), format!("{}/token", server.uri()));
    let authenticated = AuthenticatedClient::new(http, authority, store, identity)
        .await
        .expect("authenticated client");

    let config = WorldcatConfig {
        token_url: format!("{}/token", server.uri()),
        api_base_url: server.uri(),
        search_base_url: server.uri(),
    };
    WorldcatClient::new(authenticated, &config)
}

fn check_body() -> serde_json::Value {
    json!({
        "entry": [
            {"requestedOclcNumber": "1", "currentOclcNumber": "1", "found": true, "merged": false}
        ]
    })
}

/// Mount an API endpoint that rejects the expired token and accepts the
/// fresh one, so the renew-and-replay path is observable.
async fn mount_check_endpoint(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .and(header("Authorization", "Bearer tk_expired"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .and(header("Authorization", "Bearer tk_fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(check_body()))
        .mount(server)
        .await;
}

/// Without a refresh token the renewal must use the full client-credentials
/// grant and persist the newly issued refresh token alongside the access
/// token.
#[tokio::test]
async fn expired_token_triggers_full_grant_and_single_replay() {
    let server = MockServer::start().await;
    mount_check_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("Authorization", "Basic a2V5OnNlY3JldA=="))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("WorldCatMetadataAPI"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tk_fresh",
            "token_type": "bearer",
            "expires_in": 1199,
            "refresh_token": "rt_new",
            "refresh_token_expires_in": 604_800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new(expired_credentials(None));
    let client = client_against(&server, store.clone(), IdentityConfig::default()).await;

    let response = client.check_control_numbers("1").await.expect("replayed request");
    assert_eq!(response.entry.len(), 1);

    let persisted = store.persisted();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].access_token, "tk_fresh");
    assert_eq!(persisted[0].refresh_token.as_deref(), Some("rt_new"));
    assert!(persisted[0].refresh_token_expires_at.is_some());

    // One rejected attempt, one token grant, one replay.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

/// With a refresh token comfortably inside its window, renewal must use the
/// refresh-token grant and keep the existing refresh token fields.
#[tokio::test]
async fn renewal_uses_refresh_grant_inside_window() {
    let server = MockServer::start().await;
    mount_check_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt_old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tk_fresh",
            "token_type": "bearer",
            "expires_in": 1199
        })))
        .expect(1)
        .mount(&server)
        .await;

    let original = expired_credentials(Some(3600));
    let store = MemoryStore::new(original.clone());
    let client = client_against(&server, store.clone(), IdentityConfig::default()).await;

    client.check_control_numbers("1").await.expect("replayed request");

    let persisted = store.persisted();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].access_token, "tk_fresh");
    // Refresh fields are untouched on this path.
    assert_eq!(persisted[0].refresh_token.as_deref(), Some("rt_old"));
    assert_eq!(persisted[0].refresh_token_expires_at, original.refresh_token_expires_at);
}

/// A refresh token within the 25-second safety margin is treated as already
/// expired: renewal falls back to the full grant.
#[tokio::test]
async fn renewal_falls_back_to_full_grant_inside_safety_margin() {
    let server = MockServer::start().await;
    mount_check_endpoint(&server).await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tk_fresh",
            "token_type": "bearer",
            "expires_in": 1199,
            "refresh_token": "rt_new",
            "refresh_token_expires_in": 604_800
        })))
        .expect(1)
        .mount(&server)
        .await;

    // 10 seconds of lifetime left: inside the margin.
    let store = MemoryStore::new(expired_credentials(Some(10)));
    let client = client_against(&server, store.clone(), IdentityConfig::default()).await;

    client.check_control_numbers("1").await.expect("replayed request");
    assert_eq!(store.persisted()[0].refresh_token.as_deref(), Some("rt_new"));
}

#[tokio::test]
async fn transaction_id_appended_only_when_identity_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(check_body()))
        .mount(&server)
        .await;

    let mut credentials = expired_credentials(None);
    credentials.access_token = "tk_fresh".into();

    let identity = IdentityConfig {
        institution_symbol: Some("ZYU".into()),
        principal_id: Some("principal-1".into()),
    };
    let client = client_against(&server, MemoryStore::new(credentials.clone()), identity).await;
    client.check_control_numbers("1").await.expect("request");

    let with_identity = &server.received_requests().await.unwrap()[0];
    let query = with_identity.url.query().unwrap_or_default();
    assert!(query.contains("transactionID=ZYU_"), "query was: {query}");
    assert!(query.contains("principal-1"), "query was: {query}");

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(check_body()))
        .mount(&server)
        .await;

    let client =
        client_against(&server, MemoryStore::new(credentials), IdentityConfig::default()).await;
    client.check_control_numbers("1").await.expect("request");

    let without_identity = &server.received_requests().await.unwrap()[0];
    let query = without_identity.url.query().unwrap_or_default();
    assert!(!query.contains("transactionID"), "query was: {query}");
}

/// Non-401 error statuses surface as typed HTTP failures without any
/// renewal or retry at this layer.
#[tokio::test]
async fn http_errors_surface_with_status_and_no_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let mut credentials = expired_credentials(None);
    credentials.access_token = "tk_fresh".into();
    let client =
        client_against(&server, MemoryStore::new(credentials), IdentityConfig::default()).await;

    let err = client.check_control_numbers("1").await.expect_err("server error");
    match err {
        BibsyncError::Http { status, detail } => {
            assert_eq!(status, 503);
            assert!(detail.contains("upstream down"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn token_endpoint_rejection_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "client authentication failed"
        })))
        .mount(&server)
        .await;

    let store = MemoryStore::new(expired_credentials(None));
    let client = client_against(&server, store.clone(), IdentityConfig::default()).await;

    let err = client.check_control_numbers("1").await.expect_err("auth failure");
    match err {
        BibsyncError::Auth(msg) => assert!(msg.contains("invalid_client")),
        other => panic!("expected auth error, got {other:?}"),
    }
    assert!(store.persisted().is_empty());
}

/// A 401 on the replayed request means renewal did not help; the client
/// must not loop.
#[tokio::test]
async fn replay_rejection_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bib/checkcontrolnumbers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tk_fresh",
            "token_type": "bearer",
            "expires_in": 1199,
            "refresh_token": "rt_new",
            "refresh_token_expires_in": 604_800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::new(expired_credentials(None));
    let client = client_against(&server, store, IdentityConfig::default()).await;

    let err = client.check_control_numbers("1").await.expect_err("auth failure");
    assert!(matches!(err, BibsyncError::Auth(_)));

    // Initial attempt, token grant, exactly one replay.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn unset_holdings_sends_delete_with_cascade() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/ih/datalist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entry": [{
                "requestedOclcNumber": "1",
                "currentOclcNumber": "1",
                "httpStatusCode": "HTTP 200 OK",
                "errorDetail": ""
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut credentials = expired_credentials(None);
    credentials.access_token = "tk_fresh".into();
    let client =
        client_against(&server, MemoryStore::new(credentials), IdentityConfig::default()).await;

    client
        .update_holdings(HoldingOperation::Unset, "1,2", Some(Cascade::Prevent))
        .await
        .expect("response");

    let request = &server.received_requests().await.unwrap()[0];
    let query = request.url.query().unwrap_or_default();
    assert!(query.contains("oclcNumbers=1%2C2"), "query was: {query}");
    assert!(query.contains("cascade=0"), "query was: {query}");
}

#[tokio::test]
async fn undecodable_response_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/brief-bibs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let mut credentials = expired_credentials(None);
    credentials.access_token = "tk_fresh".into();
    let client =
        client_against(&server, MemoryStore::new(credentials), IdentityConfig::default()).await;

    let err = client.search_brief_bibs("nl:89012345", None).await.expect_err("bad body");
    assert!(matches!(err, BibsyncError::MalformedResponse(_)));
}
