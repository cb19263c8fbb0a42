use reqwest::StatusCode;
use thiserror::Error as ThisError;

/// Response with a status code the call site did not expect.
#[derive(Debug, Clone, ThisError)]
#[error("unexpected status {status}: {body}")]
pub struct StatusError {
    pub status: StatusCode,
    /// Trimmed response body text.
    pub body: String,
}

impl StatusError {
    pub fn new(status: StatusCode, body: impl AsRef<str>) -> Self {
        Self {
            status,
            body: body.as_ref().trim().to_string(),
        }
    }

    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }
}
