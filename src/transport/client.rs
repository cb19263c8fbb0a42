use super::classify::{require_found_or_not_found, require_ok};
use super::endpoints::{ACTIVITY, BACKUP_JOB, ResourceEndpoint, VIRTUAL_DISK, VIRTUAL_MACHINE};
use super::handle::OperationHandle;
use super::http::build_http_client;
use super::request::ApiRequest;
use crate::auth::CredentialCache;
use crate::config::ApiResolvedConfig;
use crate::error::StratusError;
use crate::utils::logging::with_pretty_json_debug;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use stratus_schema::{Activity, BackupJob, VirtualDisk, VirtualMachine};
use tracing::{debug, info};
use url::Url;

/// Authenticated client for the cloud-management API.
///
/// Cheap to clone; clones share the HTTP connection pool and the [`CredentialCache`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Arc<CredentialCache>,
}

impl ApiClient {
    pub fn new(
        cfg: &ApiResolvedConfig,
        credentials: Arc<CredentialCache>,
    ) -> Result<Self, StratusError> {
        let http = build_http_client(cfg, reqwest::redirect::Policy::default())?;
        Ok(Self::with_http(http, cfg.base_url.clone(), credentials))
    }

    /// Build the client together with its credential cache.
    pub fn from_config(cfg: &ApiResolvedConfig) -> Result<Self, StratusError> {
        let credentials = Arc::new(CredentialCache::from_config(cfg)?);
        Self::new(cfg, credentials)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: Url,
        credentials: Arc<CredentialCache>,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Build the HTTP request for `req`, fetching the bearer token if needed.
    pub async fn build_request(&self, req: &ApiRequest) -> Result<reqwest::Request, StratusError> {
        let url = req.url(&self.base_url)?;
        let credential = self.credentials.get_token().await?;

        let mut builder = self
            .http
            .request(req.method().clone(), url)
            .bearer_auth(credential.token());
        if let Some(body) = req.body() {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    pub async fn execute(&self, req: &ApiRequest) -> Result<reqwest::Response, StratusError> {
        let request = self.build_request(req).await?;
        debug!(method = %request.method(), url = %request.url(), "Sending API request");
        if let Some(body) = req.body() {
            with_pretty_json_debug(body, |pretty| {
                debug!(body = %pretty, "API request body");
            });
        }
        Ok(self.http.execute(request).await?)
    }

    /// Require a 200 and decode its body.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        req: &ApiRequest,
    ) -> Result<T, StratusError> {
        let resp = self.execute(req).await?;
        let body = require_ok(resp).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Decode a 200 body, or return `None` when the response carries `not_found`.
    pub async fn fetch_optional<T: DeserializeOwned>(
        &self,
        req: &ApiRequest,
        not_found: reqwest::StatusCode,
    ) -> Result<Option<T>, StratusError> {
        let resp = self.execute(req).await?;
        match require_found_or_not_found(resp, not_found).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Issue a mutating call and return the handle of the operation it started.
    pub async fn submit(&self, req: &ApiRequest) -> Result<OperationHandle, StratusError> {
        let resp = self.execute(req).await?;
        let body = require_ok(resp).await?;
        let handle = OperationHandle::from_body(&body)?;
        info!(method = %req.method(), handle = %handle, "Operation submitted");
        Ok(handle)
    }

    /// Read one resource through its endpoint, mapping the endpoint's not-found code to `None`.
    ///
    /// A 200 body that does not decode is a [`StratusError::MalformedSnapshot`], not a JSON error.
    pub async fn read<T: DeserializeOwned>(
        &self,
        endpoint: &ResourceEndpoint,
        id: &str,
    ) -> Result<Option<T>, StratusError> {
        let resp = self.execute(&endpoint.request(id)).await?;
        let Some(body) = require_found_or_not_found(resp, endpoint.not_found).await? else {
            debug!(kind = endpoint.kind, id, "Resource not found");
            return Ok(None);
        };

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|err| StratusError::MalformedSnapshot {
                kind: endpoint.kind,
                handle: id.to_string(),
                detail: err.to_string(),
            })
    }

    pub async fn read_activity(
        &self,
        handle: &OperationHandle,
    ) -> Result<Option<Activity>, StratusError> {
        self.read(&ACTIVITY, handle.as_str()).await
    }

    pub async fn read_backup_job(
        &self,
        handle: &OperationHandle,
    ) -> Result<Option<BackupJob>, StratusError> {
        self.read(&BACKUP_JOB, handle.as_str()).await
    }

    pub async fn read_virtual_disk(&self, id: &str) -> Result<Option<VirtualDisk>, StratusError> {
        self.read(&VIRTUAL_DISK, id).await
    }

    pub async fn read_virtual_machine(
        &self,
        id: &str,
    ) -> Result<Option<VirtualMachine>, StratusError> {
        self.read(&VIRTUAL_MACHINE, id).await
    }
}
