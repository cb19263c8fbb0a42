use crate::config::ApiResolvedConfig;
use crate::error::StratusError;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use std::time::Duration;

const USER_AGENT: &str = concat!("stratus/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client honoring the proxy, timeout and multiplexing settings.
pub fn build_http_client(
    cfg: &ApiResolvedConfig,
    redirect: Policy,
) -> Result<reqwest::Client, StratusError> {
    let mut headers = HeaderMap::new();
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect)
        .connect_timeout(cfg.connect_timeout)
        .timeout(cfg.request_timeout);

    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if cfg.enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    Ok(builder.default_headers(headers).build()?)
}
