use crate::api::types::AuthUser;
use crate::storage::KeyValueStore;
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key of the access token.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key of the cached user record (JSON).
pub const USER_KEY: &str = "user";

/// A complete logged-in session.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Option<AuthUser>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// What the store currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Empty,
    /// Exactly one of the two tokens is stored. Treated as logged out.
    Partial,
    Active(Session),
}

/// Session record kept in a host-supplied [`KeyValueStore`].
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("has_access_token", &self.access_token().is_some())
            .field("has_refresh_token", &self.refresh_token().is_some())
            .finish()
    }
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).filter(|v| !v.is_empty())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Access token to send, or `None` when the session is partial.
    pub fn bearer_token(&self) -> Option<String> {
        self.refresh_token()?;
        self.access_token()
    }

    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.store
            .set(TOKEN_KEY, token)
            .context("Failed to persist access token")
    }

    /// Cached user record. An unparseable record reads as absent.
    pub fn user(&self) -> Option<AuthUser> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("ignoring unparseable cached user record: {}", e);
                None
            }
        }
    }

    pub fn set_user(&self, user: &AuthUser) -> Result<()> {
        let raw = serde_json::to_string(user)?;
        self.store
            .set(USER_KEY, &raw)
            .context("Failed to persist user record")
    }

    /// Persist a full session (login).
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(ref user) = session.user {
            self.set_user(user)?;
        }
        self.set_access_token(&session.access_token)?;
        self.store
            .set(REFRESH_TOKEN_KEY, &session.refresh_token)
            .context("Failed to persist refresh token")?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        match (self.access_token(), self.refresh_token()) {
            (Some(access_token), Some(refresh_token)) => SessionState::Active(Session {
                access_token,
                refresh_token,
                user: self.user(),
            }),
            (None, None) => SessionState::Empty,
            _ => SessionState::Partial,
        }
    }

    /// The stored session, or `None` when empty or partial.
    pub fn load(&self) -> Option<Session> {
        match self.state() {
            SessionState::Active(session) => Some(session),
            SessionState::Empty | SessionState::Partial => None,
        }
    }

    /// Remove tokens and the cached user. Safe to call on an empty store.
    pub fn clear(&self) {
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!("failed to remove '{}' from session store: {:#}", key, e);
            }
        }
        debug!("session cleared");
    }
}
