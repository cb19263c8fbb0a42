use thiserror::Error as ThisError;

use super::IsRetryable;
use super::oauth::OauthError;
use super::status::StatusError;

#[derive(Debug, ThisError)]
pub enum StratusError {
    /// Request construction or network failure.
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error(transparent)]
    Oauth(#[from] OauthError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid operation handle: {0}")]
    InvalidHandle(String),

    /// Backend-reported terminal failure of the operation.
    #[error("{kind} {handle} failed: {reason}")]
    OperationFailed {
        kind: &'static str,
        handle: String,
        reason: String,
    },

    #[error("{kind} {handle} returned a malformed snapshot: {detail}")]
    MalformedSnapshot {
        kind: &'static str,
        handle: String,
        detail: String,
    },

    /// Descriptive error for an operation that is still running.
    #[error("{kind} {handle} is still pending: {detail}")]
    Pending {
        kind: &'static str,
        handle: String,
        detail: String,
    },

    #[error("{kind} {handle} disappeared while being polled")]
    Vanished { kind: &'static str, handle: String },

    #[error("wait cancelled")]
    Cancelled,

    #[error("wait deadline exceeded")]
    DeadlineExceeded,

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl StratusError {
    /// The wait was abandoned by the caller; the operation may still be running.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StratusError::Cancelled | StratusError::DeadlineExceeded)
    }

    /// The backend reported the operation as failed, or lost track of it.
    pub fn is_domain_failure(&self) -> bool {
        matches!(
            self,
            StratusError::OperationFailed { .. } | StratusError::Vanished { .. }
        )
    }

    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            StratusError::Status(err) => Some(err.status),
            StratusError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

impl IsRetryable for StratusError {
    fn is_retryable(&self) -> bool {
        match self {
            StratusError::Transport(err) => err.is_connect() || err.is_timeout(),
            StratusError::Oauth(err) => err.is_retryable(),
            StratusError::Status(err) => {
                err.status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || err.status.is_server_error()
            }
            StratusError::MalformedSnapshot { .. } | StratusError::Pending { .. } => true,
            _ => false,
        }
    }
}
