use super::Credential;
use crate::config::AuthConfig;
use crate::error::{IsRetryable, OauthError, StratusError};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{ClientId, ClientSecret, Scope, TokenResponse, TokenUrl};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Exchanges the configured client id/secret for a bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<Credential, StratusError>;
}

fn auth_retry_policy(max_times: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(max_times)
        .with_jitter()
}

#[derive(Serialize)]
struct PersonalAccessTokenRequest<'a> {
    id: &'a str,
    secret: &'a str,
}

/// `POST {"id", "secret"}` to the token URL; a 200 body is the token itself.
pub struct PersonalAccessTokenSource {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    retry_policy: ExponentialBuilder,
}

impl PersonalAccessTokenSource {
    pub fn new(cfg: &AuthConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            token_url: cfg.token_url.clone(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            retry_policy: auth_retry_policy(cfg.retry_max_times),
        }
    }

    async fn request_once(&self) -> Result<String, OauthError> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .json(&PersonalAccessTokenRequest {
                id: &self.client_id,
                secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body = String::from_utf8_lossy(&bytes);

        if status != StatusCode::OK {
            return Err(OauthError::UpstreamStatus {
                status,
                body: body.trim().to_string(),
            });
        }

        parse_raw_token(&body)
    }
}

/// Accepts the token either bare or as a JSON string literal.
fn parse_raw_token(body: &str) -> Result<String, OauthError> {
    let trimmed = body.trim();
    let token = if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed).map_err(|e| OauthError::Parse {
            message: e.to_string(),
            body: crate::utils::logging::body_preview(trimmed),
        })?
    } else {
        trimmed.to_string()
    };

    if token.is_empty() {
        return Err(OauthError::EmptyToken);
    }
    Ok(token)
}

#[async_trait]
impl TokenSource for PersonalAccessTokenSource {
    async fn fetch(&self) -> Result<Credential, StratusError> {
        debug!(token_url = %self.token_url, "Requesting personal access token");

        let token = (|| self.request_once())
            .retry(self.retry_policy)
            .when(|err: &OauthError| err.is_retryable())
            .notify(|err: &OauthError, dur: Duration| {
                warn!(error = %err, "Token request failed, retry after {:?}", dur);
            })
            .await?;

        Ok(Credential::new(token))
    }
}

/// OAuth2 `client_credentials` grant through the `oauth2` crate.
pub struct ClientCredentialsSource {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    retry_policy: ExponentialBuilder,
}

impl ClientCredentialsSource {
    pub fn new(cfg: &AuthConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            token_url: cfg.token_url.clone(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            scopes: cfg.scopes.clone(),
            retry_policy: auth_retry_policy(cfg.retry_max_times),
        }
    }

    async fn request_once(&self) -> Result<String, OauthError> {
        let token_url =
            TokenUrl::new(self.token_url.to_string()).map_err(|e| OauthError::Other {
                message: format!("invalid token url: {e}"),
            })?;

        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_token_uri(token_url);

        let mut request = client.exchange_client_credentials();
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let token: BasicTokenResponse = request.request_async(&self.http).await?;
        let secret = token.access_token().secret().clone();
        if secret.is_empty() {
            return Err(OauthError::EmptyToken);
        }
        Ok(secret)
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsSource {
    async fn fetch(&self) -> Result<Credential, StratusError> {
        debug!(token_url = %self.token_url, "Requesting OAuth2 client credentials token");

        let token = (|| self.request_once())
            .retry(self.retry_policy)
            .when(|err: &OauthError| err.is_retryable())
            .notify(|err: &OauthError, dur: Duration| {
                warn!(error = %err, "Token request failed, retry after {:?}", dur);
            })
            .await?;

        Ok(Credential::new(token))
    }
}
