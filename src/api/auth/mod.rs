use crate::api::types::AuthUser;
use crate::client::{ApiClient, LOGIN_ENDPOINT, REFRESH_ENDPOINT};
use crate::errors::CrmResult;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ME_ENDPOINT: &str = "/auth/me";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Serialize)]
struct RefreshTokenBody<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// `/auth/*` endpoints. These calls do not touch the stored session; see
/// [`crate::auth::AuthManager`] for the stateful flow.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, username: &str, password: &str) -> CrmResult<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.client.post(LOGIN_ENDPOINT, &body).await
    }

    pub async fn me(&self) -> CrmResult<AuthUser> {
        self.client.get(ME_ENDPOINT).await
    }

    /// Explicit token exchange. Requests that hit a `401` refresh on their own.
    pub async fn refresh(&self, refresh_token: &str) -> CrmResult<RefreshTokenResponse> {
        self.client
            .post(REFRESH_ENDPOINT, &RefreshTokenBody { refresh_token })
            .await
    }

    pub async fn logout(&self, refresh_token: &str) -> CrmResult<LogoutResponse> {
        self.client
            .post(LOGOUT_ENDPOINT, &RefreshTokenBody { refresh_token })
            .await
    }
}
