//! Client error types

use thiserror::Error;

/// Result alias used throughout the client
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// No access token was stored when an authenticated call was attempted
    MissingAccessToken,
    /// The server answered 401 and no refresh token was stored
    MissingRefreshToken,
    /// The refresh endpoint refused the refresh token
    RefreshRejected(u16),
    /// The refresh endpoint answered 2xx without a new access token
    RefreshIncomplete,
    /// The user signed out
    LoggedOut,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAccessToken => write!(f, "no access token stored"),
            Self::MissingRefreshToken => write!(f, "no refresh token stored"),
            Self::RefreshRejected(status) => write!(f, "refresh rejected with status {status}"),
            Self::RefreshIncomplete => write!(f, "refresh response carried no access token"),
            Self::LoggedOut => write!(f, "logged out"),
        }
    }
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The session was cleared and the user sent back to login; there is no result
    #[error("Session terminated: {0}")]
    SessionTerminated(TerminationReason),

    /// Login was refused; the backend reason is intentionally not carried
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The backend refused the operation with a message meant for the user
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Session storage could not be read or written
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Consume a non-success response and turn it into an error, preferring
    /// the backend's `error` (or `detail`) field over the raw body
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });
        Self::from_status(status, message)
    }

    /// Whether this error means the user no longer has a session
    pub const fn is_session_terminated(&self) -> bool {
        matches!(self, Self::SessionTerminated(_))
    }

    /// Text suitable for showing to the user as-is
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message)
            | Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Forbidden(message)
            | Self::AuthenticationFailed(message)
            | Self::ServerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Pull a human readable message out of a JSON error body
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
