use super::*;
use crate::session::{REFRESH_TOKEN_KEY, TOKEN_KEY, USER_KEY};
use crate::storage::MemoryStore;
use futures_util::future::join_all;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_JSON: &str = r#"{"id":"u1","username":"sari","role":"admin"}"#;

fn logged_in_store(access: &str, refresh: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, access).unwrap();
    store.set(REFRESH_TOKEN_KEY, refresh).unwrap();
    store.set(USER_KEY, USER_JSON).unwrap();
    store
}

fn client_for(server: &MockServer, store: &Arc<MemoryStore>) -> ApiClient {
    ApiClient::new(&format!("{}/api", server.uri()), store.clone())
}

fn count_events(rx: &mut broadcast::Receiver<AuthEvent>) -> usize {
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}

fn assert_session_cleared(store: &MemoryStore) {
    assert!(store.get(TOKEN_KEY).is_none());
    assert!(store.get(REFRESH_TOKEN_KEY).is_none());
    assert!(store.get(USER_KEY).is_none());
}

async fn mount_refresh(server: &MockServer, template: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(template)
        .expect(times)
        .mount(server)
        .await;
}

#[test]
fn test_is_auth_endpoint() {
    assert!(is_auth_endpoint("/auth/login"));
    assert!(is_auth_endpoint("/auth/refresh"));
    assert!(!is_auth_endpoint("/auth/me"));
    assert!(!is_auth_endpoint("/auth/logout"));
    assert!(!is_auth_endpoint("/leads"));
}

#[test]
fn test_base_url_trailing_slash_trimmed() {
    let client = ApiClient::new("https://crm.example/api/", Arc::new(MemoryStore::new()));
    assert_eq!(client.base_url(), "https://crm.example/api");
    assert_eq!(client.url("/leads"), "https://crm.example/api/leads");
    assert_eq!(client.url("leads"), "https://crm.example/api/leads");
}

#[test]
fn test_debug_does_not_leak_tokens() {
    let store = logged_in_store("secret-access", "secret-refresh");
    let client = ApiClient::new("https://crm.example/api", store);
    let debug = format!("{:?}", client);
    assert!(!debug.contains("secret-access"));
    assert!(!debug.contains("secret-refresh"));
}

#[tokio::test]
async fn test_get_attaches_bearer_and_returns_body_unchanged() {
    let server = MockServer::start().await;
    let body = json!({
        "data": [],
        "meta": {"total": 0, "page": 1, "limit": 10, "totalPages": 0}
    });
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer tok-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let store = logged_in_store("tok-1", "ref-1");
    let client = client_for(&server, &store);
    let result: Value = client
        .get_with("/leads", &json!({"status": ["New"]}))
        .await
        .unwrap();

    assert_eq!(result, body);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), Some("status=New"));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/provinces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, &store);
    let result: Vec<Value> = client.get("/provinces").await.unwrap();
    assert!(result.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_get_array_params_repeat_and_absent_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let _: Value = client
        .get_with(
            "/leads",
            &json!({"status": ["New", "Deal"], "city": null}),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap();
    assert_eq!(query, "status=New&status=Deal");
    assert!(!query.contains("city"));
}

#[tokio::test]
async fn test_empty_params_add_no_question_mark() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/proposals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let _: Value = client
        .get_with("/proposals", &json!({"leadId": null}))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/leads"))
        .and(body_json(json!({"name": "Toko Maju"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "l1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let created: Value = client
        .post("/leads", &json!({"name": "Toko Maju"}))
        .await
        .unwrap();
    assert_eq!(created["id"], "l1");
}

#[tokio::test]
async fn test_patch_put_delete_methods() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/leads/l1/status"))
        .and(body_json(json!({"status": "Deal"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Deal"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/leads/l1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let patched: Value = client
        .patch("/leads/l1/status", &json!({"status": "Deal"}))
        .await
        .unwrap();
    assert_eq!(patched["status"], "Deal");

    let put: Value = client.put("/settings", &json!({"theme": "dark"})).await.unwrap();
    assert_eq!(put["ok"], true);

    let () = client.delete("/leads/l1").await.unwrap();
}

#[tokio::test]
async fn test_post_empty_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/provinces/seed"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"message": "ok", "count": 34})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let seeded: Value = client.post_empty("/provinces/seed").await.unwrap();
    assert_eq!(seeded["count"], 34);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_204_resolves_to_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/u9"))
        .respond_with(ResponseTemplate::new(204).set_body_string("ignored"))
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let result: Value = client.delete("/users/u9").await.unwrap();
    assert_eq!(result, json!({}));
}

#[tokio::test]
async fn test_non_json_error_body_uses_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analytics/funnel"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>upstream died</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let err = client.get::<Value>("/analytics/funnel").await.unwrap_err();
    match err {
        CrmError::Http {
            message,
            status_code,
            error,
        } => {
            assert_eq!(message, "Internal Server Error");
            assert_eq!(status_code, 500);
            assert!(error.is_none());
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_json_error_body_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "statusCode": 404, "message": "Lead not found", "error": "Not Found"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let err = client.get::<Value>("/leads/missing").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Lead not found");
    assert_eq!(err.error_code(), Some("Not Found"));
}

#[tokio::test]
async fn test_invalid_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server, &logged_in_store("a", "r"));
    let err = client.get::<Value>("/leads/stats").await.unwrap_err();
    assert!(matches!(err, CrmError::Decode { .. }));
    assert_eq!(err.status_code(), 0);
}

#[tokio::test]
async fn test_network_error_has_status_zero() {
    // Nothing listens on port 1
    let client = ApiClient::new("http://127.0.0.1:1/api", Arc::new(MemoryStore::new()));
    let err = client.get::<Value>("/leads").await.unwrap_err();
    assert!(matches!(err, CrmError::Network { .. }));
    assert_eq!(err.status_code(), 0);
}

#[tokio::test]
async fn test_expired_token_refreshes_and_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "l1"}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refreshToken": "ref-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);
    let mut events = client.subscribe();

    let result: Value = client.get("/leads").await.unwrap();

    assert_eq!(result, json!({"data": [{"id": "l1"}]}));
    assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("new"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref-1"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(count_events(&mut events), 0);
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_refresh_request_has_no_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_string(USER_JSON))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})),
        1,
    )
    .await;

    let client = client_for(&server, &logged_in_store("old", "ref-1"));
    let me: Value = client.get("/auth/me").await.unwrap();
    assert_eq!(me["username"], "sari");

    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/api/auth/refresh")
        .unwrap();
    assert!(refresh.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_second_401_after_refresh_does_not_refresh_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthorized", "statusCode": 401
        })))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access_token": "new"})),
        1,
    )
    .await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);
    let mut events = client.subscribe();

    let err = client.get::<Value>("/users").await.unwrap_err();

    assert_eq!(err.status_code(), 401);
    assert!(matches!(err, CrmError::Http { .. }));
    assert_session_cleared(&store);
    assert_eq!(count_events(&mut events), 1);
}

#[tokio::test]
async fn test_refresh_failure_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid refresh token"})),
        1,
    )
    .await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);
    let mut events = client.subscribe();

    let err = client.get::<Value>("/leads").await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(err.message().contains("Refresh token expired or invalid"));
    assert_session_cleared(&store);
    assert_eq!(count_events(&mut events), 1);
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_calling_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "orphan").unwrap();
    let client = client_for(&server, &store);
    let mut events = client.subscribe();

    let err = client.get::<Value>("/leads").await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(err.message().contains("No refresh token available"));
    assert_session_cleared(&store);
    assert_eq!(count_events(&mut events), 1);
}

#[tokio::test]
async fn test_refresh_network_error_tears_down_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "late"}))
            .set_delay(Duration::from_secs(2)),
        1,
    )
    .await;

    let store = logged_in_store("old", "ref-1");
    let http = Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let client =
        ApiClient::with_http_client(&format!("{}/api", server.uri()), store.clone(), http);
    let mut events = client.subscribe();

    let err = client.get::<Value>("/leads").await.unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(err.status_code(), 0);
    assert_session_cleared(&store);
    assert_eq!(count_events(&mut events), 1);
}

#[tokio::test]
async fn test_401_on_login_tears_down_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid credentials", "error": "Unauthorized", "statusCode": 401
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let store = logged_in_store("stale", "ref-1");
    let client = client_for(&server, &store);
    let mut events = client.subscribe();

    let err = client
        .post::<Value, _>("/auth/login", &json!({"username": "x", "password": "y"}))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 401);
    assert_eq!(err.message(), "Invalid credentials");
    assert_eq!(err.error_code(), Some("Unauthorized"));
    assert_session_cleared(&store);
    assert_eq!(count_events(&mut events), 1);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(5)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "new"}))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);

    let results = join_all((0..5).map(|_| {
        let client = client.clone();
        async move { client.get::<Value>("/leads").await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap(), json!({"data": []}));
    }
    assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("new"));
}

#[tokio::test]
async fn test_concurrent_refresh_failure_tears_down_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(401))
        .expect(4)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(500).set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);
    let mut events = client.subscribe();

    let results = join_all((0..4).map(|_| client.get::<Value>("/leads"))).await;

    for result in results {
        assert!(result.unwrap_err().is_session_expired());
    }
    assert_session_cleared(&store);
    assert_eq!(count_events(&mut events), 1);
}

#[tokio::test]
async fn test_refresh_runs_again_after_previous_window_closed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(500), 2).await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);

    assert!(client.get::<Value>("/leads").await.unwrap_err().is_session_expired());

    // Log back in and hit another expired token
    store.set(TOKEN_KEY, "old-2").unwrap();
    store.set(REFRESH_TOKEN_KEY, "ref-2").unwrap();
    assert!(client.get::<Value>("/leads").await.unwrap_err().is_session_expired());
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let client = ApiClient::new("http://127.0.0.1:1/api", store.clone());
    let mut events = client.subscribe();

    client.teardown_session();
    client.teardown_session();

    assert!(store.is_empty());
    assert_eq!(count_events(&mut events), 2);
}

#[tokio::test]
async fn test_from_config_rejects_invalid_base_url() {
    let config = ApiConfig {
        base_url: "ftp://crm.example".into(),
        ..ApiConfig::default()
    };
    let err = ApiClient::from_config(&config, Arc::new(MemoryStore::new())).unwrap_err();
    assert!(matches!(err, CrmError::Config(_)));
}

#[tokio::test]
async fn test_abandoned_refresh_still_completes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "new"}))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let store = logged_in_store("old", "ref-1");
    let client = client_for(&server, &store);

    let waited = tokio::time::timeout(
        Duration::from_millis(100),
        client.get::<Value>("/leads"),
    )
    .await;
    assert!(waited.is_err());
    assert!(client.is_refreshing());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(!client.is_refreshing());
    assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("new"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref-1"));
}

#[tokio::test]
async fn test_partial_session_sends_no_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/provinces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(TOKEN_KEY, "orphan").unwrap();
    let client = client_for(&server, &store);

    let _: Value = client.get("/provinces").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[test]
fn test_new_applies_default_timeouts() {
    let client = ApiClient::new("https://crm.example/api", Arc::new(MemoryStore::new()));
    assert_eq!(client.base_url(), "https://crm.example/api");
    assert!(!client.is_refreshing());
}
