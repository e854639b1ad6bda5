use crate::api::types::AuthUser;
use crate::client::ApiClient;
use crate::errors::CrmResult;
use crate::session::{Session, SessionState};
use tracing::{debug, info, warn};

/// Stateful login flow on top of [`ApiClient`].
///
/// The client already refreshes and tears down on its own; this type owns
/// the parts that create or end a session deliberately.
#[derive(Debug, Clone)]
pub struct AuthManager {
    client: ApiClient,
}

impl AuthManager {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Exchange credentials for tokens and persist the session.
    pub async fn login(&self, username: &str, password: &str) -> CrmResult<AuthUser> {
        let resp = self.client.auth().login(username, password).await?;
        self.client.session().save(&Session {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            user: Some(resp.user.clone()),
        })?;
        info!("logged in as {}", resp.user.username);
        Ok(resp.user)
    }

    /// Revoke the refresh token server-side (best effort), then end the session.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.client.session().refresh_token() {
            match self.client.auth().logout(&refresh_token).await {
                Ok(_) => debug!("refresh token revoked"),
                Err(e) => warn!("logout request failed: {}", e),
            }
        }
        self.client.teardown_session();
        info!("logged out");
    }

    /// Re-validate a stored session against `/auth/me`.
    ///
    /// Returns `Ok(None)` when there is nothing to restore. A half-written
    /// session is discarded through [`logout`](Self::logout). When the server
    /// rejects the session the local state is cleared and the error returned.
    pub async fn restore(&self) -> CrmResult<Option<AuthUser>> {
        match self.client.session().state() {
            SessionState::Empty => Ok(None),
            SessionState::Partial => {
                warn!("discarding incomplete stored session");
                self.logout().await;
                Ok(None)
            }
            SessionState::Active(_) => match self.client.auth().me().await {
                Ok(user) => {
                    self.client.session().set_user(&user)?;
                    debug!("session restored for {}", user.username);
                    Ok(Some(user))
                }
                Err(e) => {
                    warn!("stored session is no longer valid: {}", e);
                    self.logout().await;
                    Err(e)
                }
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.session().load().is_some()
    }

    /// The cached user record, without a network round trip.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.client.session().user()
    }

    pub fn is_superadmin(&self) -> bool {
        self.current_user().is_some_and(|u| u.is_superadmin())
    }

    pub fn is_admin(&self) -> bool {
        self.current_user().is_some_and(|u| u.is_admin())
    }
}
