pub mod query;
pub mod response;

use crate::config::ApiConfig;
use crate::errors::{CrmError, CrmResult};
use crate::events::{AuthEvent, AuthEvents};
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use anyhow::Context;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

const NO_REFRESH_TOKEN: &str = "No refresh token available";
const REFRESH_REJECTED: &str = "Refresh token expired or invalid";

/// Outcome shared by every caller waiting on one refresh. The error side is
/// the failure message; it must be `Clone` to live inside `Shared`.
type RefreshOutcome = Result<String, String>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;
type RefreshSlot = Mutex<Option<PendingRefresh>>;

#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
}

/// True for endpoints that must never trigger a token refresh.
pub fn is_auth_endpoint(endpoint: &str) -> bool {
    endpoint.contains(LOGIN_ENDPOINT) || endpoint.contains(REFRESH_ENDPOINT)
}

/// JSON client for the CRM backend.
///
/// Attaches the stored access token to every request. A `401` on a regular
/// endpoint refreshes the token once (shared by all concurrent callers) and
/// retries the request once. Unrecoverable auth failures clear the session and
/// emit [`AuthEvent::LoginRequired`].
///
/// Cheap to clone; clones share the session, event channel and refresh state.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Arc<str>,
    http: Client,
    session: SessionStore,
    events: AuthEvents,
    pending_refresh: Arc<RefreshSlot>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refreshing = self
            .pending_refresh
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("refreshing", &refreshing)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client with default timeouts (10 s connect, 30 s overall).
    pub fn new(base_url: &str, store: Arc<dyn KeyValueStore>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build HTTP client, using defaults without timeouts: {}", e);
                Client::new()
            });
        Self::with_http_client(base_url, store, http)
    }

    pub fn with_http_client(base_url: &str, store: Arc<dyn KeyValueStore>, http: Client) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            http,
            session: SessionStore::new(store),
            events: AuthEvents::new(),
            pending_refresh: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(config: &ApiConfig, store: Arc<dyn KeyValueStore>) -> CrmResult<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs));
        if let Some(ref agent) = config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| CrmError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http_client(&config.base_url, store, http))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Whether a token refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') || endpoint.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> CrmResult<T> {
        self.request(Method::GET, endpoint, None).await
    }

    /// GET with query parameters (see [`query::encode`] for the encoding rules).
    pub async fn get_with<T, Q>(&self, endpoint: &str, params: &Q) -> CrmResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let qs = query::encode(params)?;
        let endpoint = query::with_query(endpoint, &qs);
        self.request(Method::GET, &endpoint, None).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> CrmResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(Method::POST, endpoint, Some(body)).await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> CrmResult<T> {
        self.request(Method::POST, endpoint, None).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: &B) -> CrmResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(Method::PATCH, endpoint, Some(body)).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> CrmResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = encode_body(body)?;
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> CrmResult<T> {
        self.request(Method::DELETE, endpoint, None).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> CrmResult<T> {
        let url = self.url(endpoint);
        let mut retry_count = 0u8;

        loop {
            let resp = self.send(method.clone(), &url, body.as_deref()).await?;
            let status = resp.status();
            debug!("{} {} -> {}", method, endpoint, status.as_u16());

            if status.is_success() {
                return response::decode_success(resp).await;
            }

            if status == StatusCode::UNAUTHORIZED {
                if retry_count == 0 && !is_auth_endpoint(endpoint) {
                    info!("got 401 from {}, refreshing access token", endpoint);
                    drop(resp);
                    self.refresh_access_token().await?;
                    retry_count += 1;
                    continue;
                }
                warn!(
                    "401 from {} (retry {}), ending session",
                    endpoint, retry_count
                );
                self.teardown_session();
            }

            return Err(response::error_from_response(resp).await);
        }
    }

    async fn send(&self, method: Method, url: &str, body: Option<&[u8]>) -> CrmResult<Response> {
        let mut req = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.bearer_token() {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            req = req.body(body.to_vec());
        }
        req.send().await.map_err(|e| CrmError::Network {
            message: e.to_string(),
        })
    }

    /// Obtain a fresh access token, joining the in-flight refresh if there is one.
    ///
    /// On failure the session has been torn down (once per refresh, not once
    /// per waiting caller) and `CrmError::SessionExpired` is returned.
    pub async fn refresh_access_token(&self) -> CrmResult<String> {
        let pending = {
            let mut slot = self
                .pending_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(pending) = slot.as_ref() {
                debug!("joining in-flight token refresh");
                pending.clone()
            } else {
                let pending = self.start_refresh();
                *slot = Some(pending.clone());
                pending
            }
            // slot guard dropped here, before the first await
        };

        pending
            .await
            .map_err(|message| CrmError::SessionExpired { message })
    }

    fn start_refresh(&self) -> PendingRefresh {
        let task = RefreshTask {
            url: self.url(REFRESH_ENDPOINT),
            http: self.http.clone(),
            session: self.session.clone(),
            events: self.events.clone(),
            slot: Arc::downgrade(&self.pending_refresh),
        };
        // Runs to completion on its own task, so abandoned waiters never
        // leave the slot occupied or the new token unsaved.
        let handle = tokio::spawn(task.run());
        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(format!("token refresh task failed: {}", e)))
        }
        .boxed()
        .shared()
    }

    /// Clear the stored session and ask the host to show the login screen.
    ///
    /// Idempotent: on an empty session only the event is emitted.
    pub fn teardown_session(&self) {
        end_session(&self.session, &self.events);
    }
}

fn end_session(session: &SessionStore, events: &AuthEvents) {
    session.clear();
    events.emit(AuthEvent::LoginRequired);
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> CrmResult<Vec<u8>> {
    Ok(serde_json::to_vec(body).context("Failed to serialize request body")?)
}

/// Everything one refresh needs, detached from the client so the shared
/// future does not keep its own slot alive.
struct RefreshTask {
    url: String,
    http: Client,
    session: SessionStore,
    events: AuthEvents,
    slot: Weak<RefreshSlot>,
}

impl RefreshTask {
    async fn run(self) -> RefreshOutcome {
        let outcome = self.exchange().await;

        if let Some(slot) = self.slot.upgrade() {
            slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        }

        match outcome {
            Ok(token) => {
                info!("access token refreshed");
                Ok(token)
            }
            Err(message) => {
                warn!("token refresh failed: {}", message);
                end_session(&self.session, &self.events);
                Err(message)
            }
        }
    }

    async fn exchange(&self) -> Result<String, String> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(|| NO_REFRESH_TOKEN.to_string())?;

        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&RefreshTokenRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            debug!("refresh endpoint returned {}", resp.status().as_u16());
            return Err(REFRESH_REJECTED.to_string());
        }

        let data: RefreshTokenResponse = resp
            .json()
            .await
            .map_err(|e| format!("invalid refresh response: {}", e))?;

        self.session
            .set_access_token(&data.access_token)
            .map_err(|e| format!("{:#}", e))?;

        Ok(data.access_token)
    }
}

#[cfg(test)]
mod tests;
