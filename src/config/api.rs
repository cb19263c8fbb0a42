use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static DEFAULT_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://shiva.cloud-temple.com/api/").expect("invalid fixed default base URL")
});

static DEFAULT_TOKEN_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://shiva.cloud-temple.com/api/iam/v2/auth/personal_access_token")
        .expect("invalid fixed default token URL")
});

/// How the client id/secret pair is exchanged for a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlow {
    /// `POST {"id", "secret"}` to the token URL; the response body is the raw JWT.
    #[default]
    PersonalAccessToken,
    /// Standard OAuth2 `client_credentials` grant against the token URL.
    ClientCredentials,
}

/// Authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// TOML: `api.auth.flow`. Default: `personal_access_token`.
    #[serde(default)]
    pub flow: AuthFlow,

    /// TOML: `api.auth.token_url`.
    #[serde(default = "default_token_url")]
    pub token_url: Url,

    /// TOML: `api.auth.client_id`. Must be provided.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub client_id: String,

    /// TOML: `api.auth.client_secret`. Must be provided.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub client_secret: String,

    /// OAuth2 scopes, only sent by the `client_credentials` flow.
    /// TOML: `api.auth.scopes`. Default: empty.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Max retry attempts for the token request on transient failures.
    /// TOML: `api.auth.retry_max_times`. Default: `3`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,
}

/// Backend API configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL every request path is resolved against.
    /// TOML: `api.base_url`. Default: `https://shiva.cloud-temple.com/api/`.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `api.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Allow HTTP/2 multiplexing for reqwest clients; disabled forces HTTP/1.
    /// TOML: `api.enable_multiplexing`. Default: `true`.
    #[serde(default = "default_enable_multiplexing")]
    pub enable_multiplexing: bool,

    /// TOML: `api.connect_timeout_secs`. Default: `5`.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout, covering a single status read.
    /// TOML: `api.request_timeout_secs`. Default: `30`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ApiResolvedConfig {
    pub base_url: Url,
    pub auth: AuthConfig,
    pub proxy: Option<Url>,
    pub enable_multiplexing: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn resolve(&self) -> ApiResolvedConfig {
        ApiResolvedConfig {
            base_url: self.base_url.clone(),
            auth: self.auth.clone(),
            proxy: self.proxy.clone(),
            enable_multiplexing: self.enable_multiplexing,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            flow: AuthFlow::default(),
            token_url: default_token_url(),
            // No usable default. `Config::from_toml()` enforces non-empty.
            client_id: String::new(),
            client_secret: String::new(),
            scopes: Vec::new(),
            retry_max_times: default_retry_max_times(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth: AuthConfig::default(),
            proxy: None,
            enable_multiplexing: default_enable_multiplexing(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for api.auth credentials",
        )),
    }
}

fn default_base_url() -> Url {
    DEFAULT_BASE_URL.clone()
}

fn default_token_url() -> Url {
    DEFAULT_TOKEN_URL.clone()
}

fn default_enable_multiplexing() -> bool {
    true
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_max_times() -> usize {
    3
}
