use super::IsRetryable;
use super::stratus::StratusError;
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use reqwest::StatusCode;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum OauthError {
    #[error("Authentication request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Authentication upstream error with status {status}: {body:.200}")]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("Authentication server response error: {error}")]
    ServerResponse { error: String },

    #[error("Token endpoint parse error: {message}. Body: {body}")]
    Parse { message: String, body: String },

    #[error("Authentication returned an empty token")]
    EmptyToken,

    #[error("Authentication unexpected error: {message}")]
    Other { message: String },
}

impl IsRetryable for OauthError {
    fn is_retryable(&self) -> bool {
        match self {
            OauthError::Request(_) => true,
            OauthError::UpstreamStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            OauthError::Parse { .. } => true,
            _ => false,
        }
    }
}

type TokenExchangeError = RequestTokenError<
    HttpClientError<ReqwestClientError>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

impl From<TokenExchangeError> for OauthError {
    fn from(e: TokenExchangeError) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => OauthError::ServerResponse {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(wrapper) => match wrapper {
                oauth2::HttpClientError::Reqwest(real_err) => OauthError::Request(*real_err),
                other => OauthError::Other {
                    message: format!("HttpClientError: {other:?}"),
                },
            },
            RequestTokenError::Parse(parse_err, body) => {
                let body_str = String::from_utf8_lossy(&body);
                let body = body_str
                    .char_indices()
                    .nth(100)
                    .map(|(idx, _)| format!("{}...<truncated>", &body_str[..idx]))
                    .unwrap_or_else(|| body_str.into_owned());
                OauthError::Parse {
                    message: parse_err.to_string(),
                    body,
                }
            }
            RequestTokenError::Other(s) => OauthError::Other { message: s },
        }
    }
}

impl From<TokenExchangeError> for StratusError {
    fn from(e: TokenExchangeError) -> Self {
        OauthError::from(e).into()
    }
}
