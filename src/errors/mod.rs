use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed error hierarchy for crm-client.
///
/// Every failed request resolves to one of these. Transport, decode and session
/// failures carry a status code of `0`, HTTP failures carry the response status.
/// Leaf helpers (config loader, file storage) use `anyhow::Result`; the `Internal`
/// variant lets `?` convert them at the boundary.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("{message}")]
    Http {
        message: String,
        status_code: u16,
        error: Option<String>,
    },

    #[error("{message}")]
    Network { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// The access token could not be refreshed. The stored session has already
    /// been torn down when this is returned.
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using `CrmError`.
pub type CrmResult<T> = std::result::Result<T, CrmError>;

/// Wire shape of a request failure: `{ message, statusCode, error? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CrmError {
    /// HTTP status of the failed response, or `0` when no response was received.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Http { status_code, .. } => *status_code,
            _ => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } | Self::Network { message } => message.clone(),
            _ => self.to_string(),
        }
    }

    /// Backend error code (e.g. `"Unauthorized"`), when the body carried one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Http { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// True when the session was torn down as part of this failure.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == 401
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError {
            message: self.message(),
            status_code: self.status_code(),
            error: self.error_code().map(ToString::to_string),
        }
    }
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}
