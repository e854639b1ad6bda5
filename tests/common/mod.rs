// Shared test helpers: not all items used by every test binary.
#![allow(unused)]

use crm_client::session::{REFRESH_TOKEN_KEY, TOKEN_KEY, USER_KEY};
use crm_client::{ApiClient, FileStore, KeyValueStore, MemoryStore};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_JSON: &str = r#"{"id":"u1","username":"sari","role":"admin","provinceId":"p1"}"#;

pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

pub fn seed_session(store: &dyn KeyValueStore, access: &str, refresh: &str) {
    store.set(TOKEN_KEY, access).unwrap();
    store.set(REFRESH_TOKEN_KEY, refresh).unwrap();
    store.set(USER_KEY, USER_JSON).unwrap();
}

/// Client backed by a session file inside `tmp`.
pub fn file_client(server: &MockServer, tmp: &TempDir) -> (ApiClient, Arc<FileStore>) {
    let store = Arc::new(FileStore::new(tmp.path().join("session.json")));
    let client = ApiClient::new(&api_url(server), store.clone());
    (client, store)
}

pub fn memory_client(server: &MockServer) -> (ApiClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let client = ApiClient::new(&api_url(server), store.clone());
    (client, store)
}

pub fn lead(id: &str, status: &str) -> Value {
    json!({
        "id": id, "name": "Toko Roti", "city": "Yogyakarta", "category": "Bakery",
        "address": "Jl. Malioboro 10", "phone": "0274", "rating": 4.8,
        "website": "https://tokoroti.example", "status": status
    })
}

pub fn leads_page(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids.iter().map(|id| lead(id, "New")).collect();
    json!({
        "data": data,
        "meta": {"total": ids.len(), "page": 1, "limit": 10, "totalPages": 1}
    })
}

pub async fn mount_login(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "access_token": access,
            "refresh_token": refresh,
            "user": serde_json::from_str::<Value>(USER_JSON).unwrap()
        })))
        .mount(server)
        .await;
}

pub async fn mount_refresh(server: &MockServer, status: u16, access: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"access_token": access})))
        .expect(times)
        .mount(server)
        .await;
}
