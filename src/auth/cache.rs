use super::{ClientCredentialsSource, Credential, PersonalAccessTokenSource, TokenSource};
use crate::config::{ApiResolvedConfig, AuthFlow};
use crate::error::StratusError;
use crate::transport::build_http_client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Fetch-once bearer token cache, shared by every request an [`crate::ApiClient`] issues.
///
/// The first caller performs the exchange while holding the lock; concurrent callers queue on
/// that lock and then read the stored value, so at most one fetch is ever in flight. Failures
/// are returned to the caller that triggered them and are not stored. The future returned by
/// [`CredentialCache::get_token`] is cancel-safe: dropping it mid-fetch releases the lock and
/// leaves the cache empty.
///
/// Tokens are kept for the lifetime of the cache; there is no expiry handling.
pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    slot: Mutex<Option<Arc<Credential>>>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            slot: Mutex::new(None),
        }
    }

    /// Build the token source selected by `api.auth.flow`.
    pub fn from_config(cfg: &ApiResolvedConfig) -> Result<Self, StratusError> {
        // The oauth2 crate expects a client that does not follow redirects.
        let http = build_http_client(cfg, reqwest::redirect::Policy::none())?;
        let source: Arc<dyn TokenSource> = match cfg.auth.flow {
            AuthFlow::PersonalAccessToken => {
                Arc::new(PersonalAccessTokenSource::new(&cfg.auth, http))
            }
            AuthFlow::ClientCredentials => Arc::new(ClientCredentialsSource::new(&cfg.auth, http)),
        };
        Ok(Self::new(source))
    }

    pub async fn get_token(&self) -> Result<Arc<Credential>, StratusError> {
        let mut slot = self.slot.lock().await;
        if let Some(cred) = slot.as_ref() {
            return Ok(Arc::clone(cred));
        }

        debug!("No cached credential, fetching");
        let cred = Arc::new(self.source.fetch().await?);
        info!(
            user_id = cred.user_id().unwrap_or("<unknown>"),
            tenant_id = cred.tenant_id().unwrap_or("<unknown>"),
            "Credential acquired"
        );
        *slot = Some(Arc::clone(&cred));
        Ok(cred)
    }

    /// Current token without triggering a fetch. `None` while a fetch is in flight.
    pub fn cached(&self) -> Option<Arc<Credential>> {
        self.slot.try_lock().ok().and_then(|slot| slot.clone())
    }
}
