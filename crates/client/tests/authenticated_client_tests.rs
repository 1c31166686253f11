//! Integration tests for bearer-token handling and refresh

use reqwest::StatusCode;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tollgate_client::{
    ApiRequest, AuthenticatedClient, ClientError, FileSessionStore, PublicClient,
    RecordingNavigator, Route, SessionManager, TerminationReason, TollgateClientBuilder,
    types::TokenPair,
};
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    client: AuthenticatedClient,
    navigator: Arc<RecordingNavigator>,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let public = PublicClient::new(format!("{}/api/auth/", server.uri())).unwrap();
        Self::with_public(server, public)
    }

    fn with_public(server: MockServer, public: PublicClient) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let client = public.authenticate(SessionManager::in_memory(), navigator.clone());
        Self {
            server,
            client,
            navigator,
        }
    }

    fn sign_in(&self, access: &str, refresh: &str) {
        self.client
            .session()
            .begin(&TokenPair {
                access: access.into(),
                refresh: refresh.into(),
            })
            .unwrap();
    }

    fn access_token(&self) -> Option<String> {
        self.client.session().access_token().unwrap()
    }

    fn refresh_token(&self) -> Option<String> {
        self.client.session().refresh_token().unwrap()
    }
}

fn protected_with(token: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path("/api/auth/protected/"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
}

fn refresh_with(token: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh/"))
        .and(body_json(json!({ "refresh": token })))
}

#[tokio::test]
async fn test_missing_access_token_terminates_without_calling() {
    let h = Harness::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let result = h.client.send(&ApiRequest::get("protected/")).await;

    assert!(matches!(
        result,
        Err(ClientError::SessionTerminated(TerminationReason::MissingAccessToken))
    ));
    assert_eq!(h.navigator.current(), Some(Route::Login));
}

#[tokio::test]
async fn test_non_401_response_is_returned_untouched() {
    let h = Harness::start().await;
    h.sign_in("good", "r1");

    protected_with("good")
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let response = h.client.send(&ApiRequest::get("protected/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "boom");
    assert_eq!(h.access_token().as_deref(), Some("good"));
    assert!(h.navigator.history().is_empty());
}

#[tokio::test]
async fn test_401_refreshes_and_retries_once() {
    let h = Harness::start().await;
    h.sign_in("stale", "r1");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    protected_with("fresh")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "alice"})))
        .expect(1)
        .mount(&h.server)
        .await;
    refresh_with("r1")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let profile = h.client.profile().await.unwrap();

    assert_eq!(profile.message.as_deref(), Some("alice"));
    assert_eq!(h.access_token().as_deref(), Some("fresh"));
    assert_eq!(h.refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn test_retry_result_is_returned_even_if_401() {
    let h = Harness::start().await;
    h.sign_in("stale", "r1");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    protected_with("fresh")
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    refresh_with("r1")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let response = h.client.send(&ApiRequest::get("protected/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // The session survives; only a refused refresh ends it
    assert_eq!(h.access_token().as_deref(), Some("fresh"));
    assert!(h.navigator.history().is_empty());
}

#[tokio::test]
async fn test_refused_refresh_terminates_session() {
    let h = Harness::start().await;
    h.sign_in("stale", "expired");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    refresh_with("expired")
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is invalid"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.client.send(&ApiRequest::get("protected/")).await;

    assert!(matches!(
        result,
        Err(ClientError::SessionTerminated(TerminationReason::RefreshRejected(401)))
    ));
    assert_eq!(h.access_token(), None);
    assert_eq!(h.refresh_token(), None);
    assert_eq!(h.navigator.history(), vec![Route::Login]);
}

#[tokio::test]
async fn test_missing_refresh_token_terminates_session() {
    let h = Harness::start().await;
    h.client.session().set_access_token("stale").unwrap();

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(path("/api/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let result = h.client.send(&ApiRequest::get("protected/")).await;

    assert!(matches!(
        result,
        Err(ClientError::SessionTerminated(TerminationReason::MissingRefreshToken))
    ));
    assert_eq!(h.access_token(), None);
    assert_eq!(h.navigator.current(), Some(Route::Login));
}

#[tokio::test]
async fn test_refresh_without_access_field_terminates_session() {
    let h = Harness::start().await;
    h.sign_in("stale", "r1");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    refresh_with("r1")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.client.send(&ApiRequest::get("protected/")).await;

    assert!(matches!(
        result,
        Err(ClientError::SessionTerminated(TerminationReason::RefreshIncomplete))
    ));
    assert_eq!(h.refresh_token(), None);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let h = Harness::start().await;
    h.sign_in("stale", "r1");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    protected_with("fresh")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&h.server)
        .await;
    refresh_with("r1")
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "fresh", "refresh": "r2"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.profile().await.unwrap();

    assert_eq!(h.refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let h = Harness::start().await;
    h.sign_in("stale", "r1");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    protected_with("fresh")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(3)
        .mount(&h.server)
        .await;
    // A second refresh with the same token would be refused, as with
    // rotating refresh tokens
    refresh_with("r1")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "fresh"}))
                .set_delay(Duration::from_millis(200)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.server)
        .await;
    refresh_with("r1")
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&h.server)
        .await;

    let (a, b, c) = tokio::join!(h.client.profile(), h.client.profile(), h.client.profile());

    for profile in [a, b, c] {
        assert_eq!(profile.unwrap().username.as_deref(), Some("alice"));
    }
    assert_eq!(h.access_token().as_deref(), Some("fresh"));
    assert!(h.navigator.history().is_empty());
}

#[tokio::test]
async fn test_refresh_transport_failure_keeps_session() {
    let server = MockServer::start().await;
    let public = TollgateClientBuilder::new()
        .base_url(format!("{}/api/auth/", server.uri()))
        .timeout(Duration::from_millis(200))
        .build_public()
        .unwrap();
    let h = Harness::with_public(server, public);
    h.sign_in("stale", "r1");

    protected_with("stale")
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    refresh_with("r1")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "fresh"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&h.server)
        .await;

    let result = h.client.send(&ApiRequest::get("protected/")).await;

    assert!(matches!(result, Err(ClientError::Request(_))));
    assert_eq!(h.access_token().as_deref(), Some("stale"));
    assert_eq!(h.refresh_token().as_deref(), Some("r1"));
    assert!(h.navigator.history().is_empty());
}

#[tokio::test]
async fn test_caller_headers_survive_token_attachment() {
    let h = Harness::start().await;
    h.sign_in("good", "r1");

    Mock::given(method("POST"))
        .and(path("/api/auth/upgrade/"))
        .and(header("authorization", "Bearer good"))
        .and(header("x-request-source", "dashboard"))
        .and(body_json(json!({"price_id": "price_pro"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"plan": "pro"})))
        .expect(1)
        .mount(&h.server)
        .await;

    let request = ApiRequest::post("upgrade/")
        .header(
            HeaderName::from_static("x-request-source"),
            HeaderValue::from_static("dashboard"),
        )
        .json(&json!({"price_id": "price_pro"}))
        .unwrap();
    let response = h.client.send(&request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_execute_maps_error_statuses() {
    let h = Harness::start().await;
    h.sign_in("good", "r1");

    Mock::given(method("GET"))
        .and(path("/api/auth/transactions/"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"detail": "Not allowed"})),
        )
        .mount(&h.server)
        .await;

    let result = h.client.transactions().await;

    match result {
        Err(ClientError::Forbidden(message)) => assert_eq!(message, "Not allowed"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_corrupt_session_file_terminates_and_is_cleared() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    std::fs::write(&session_path, "{not json").unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let navigator = Arc::new(RecordingNavigator::new());
    let session = SessionManager::new(Arc::new(FileSessionStore::new(&session_path)));
    let client = PublicClient::new(format!("{}/api/auth/", server.uri()))
        .unwrap()
        .authenticate(session, navigator.clone());

    let result = client.send(&ApiRequest::get("protected/")).await;

    assert!(matches!(
        result,
        Err(ClientError::SessionTerminated(TerminationReason::MissingAccessToken))
    ));
    assert!(!session_path.exists());
    assert_eq!(navigator.history(), vec![Route::Login]);
    assert!(!client.session().has_session().unwrap());
}
