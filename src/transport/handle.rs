use crate::error::StratusError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stratus_schema::HandleEnvelope;

/// Opaque id of an asynchronous operation (activity or job), as returned by a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(id: impl AsRef<str>) -> Result<Self, StratusError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(StratusError::InvalidHandle("empty operation handle".to_string()));
        }
        Ok(Self(id.to_string()))
    }

    /// Extract the handle from the body of a mutating call.
    ///
    /// The body is either the id itself, a JSON string literal, or an object wrapping it.
    pub fn from_body(body: &[u8]) -> Result<Self, StratusError> {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();

        if text.starts_with('"') {
            let id: String = serde_json::from_str(text)?;
            return Self::new(id);
        }

        if text.starts_with('{') {
            let envelope: HandleEnvelope = serde_json::from_str(text)?;
            return envelope.into_handle().map_or_else(
                || {
                    Err(StratusError::InvalidHandle(format!(
                        "no operation id in response: {text:.100}"
                    )))
                },
                Self::new,
            );
        }

        Self::new(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OperationHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for OperationHandle {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
