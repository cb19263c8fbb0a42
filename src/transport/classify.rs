use crate::error::{StatusError, StratusError};
use crate::utils::logging::body_preview;
use reqwest::StatusCode;
use tracing::debug;

/// Read the whole body so the pooled connection can be reused.
async fn drain(resp: reqwest::Response) -> (StatusCode, Result<Vec<u8>, reqwest::Error>) {
    let status = resp.status();
    let body = resp.bytes().await.map(|bytes| bytes.to_vec());
    (status, body)
}

fn unexpected_status(status: StatusCode, body: Result<Vec<u8>, reqwest::Error>) -> StratusError {
    let text = match body {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("<failed to read body: {e}>"),
    };

    debug!(
        %status,
        body = %body_preview(text.trim()),
        "Unexpected upstream status"
    );

    StatusError::new(status, text).into()
}

/// Succeeds iff the status is 200, yielding the body.
pub async fn require_ok(resp: reqwest::Response) -> Result<Vec<u8>, StratusError> {
    let (status, body) = drain(resp).await;
    if status != StatusCode::OK {
        return Err(unexpected_status(status, body));
    }
    Ok(body?)
}

/// 200 yields `Some(body)`, `not_found` yields `None`, anything else is a [`StatusError`].
///
/// Resource kinds disagree on what "absent" looks like (404 for most, 403 for some), so the
/// caller names the code.
pub async fn require_found_or_not_found(
    resp: reqwest::Response,
    not_found: StatusCode,
) -> Result<Option<Vec<u8>>, StratusError> {
    let (status, body) = drain(resp).await;
    if status == StatusCode::OK {
        return Ok(Some(body?));
    }
    if status == not_found {
        return Ok(None);
    }
    Err(unexpected_status(status, body))
}
