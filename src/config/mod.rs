mod api;
mod basic;
mod waiter;

pub use api::{ApiConfig, ApiResolvedConfig, AuthConfig, AuthFlow};
pub use basic::BasicConfig;
pub use waiter::{WaiterConfig, WaiterResolvedConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Process-level settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Backend endpoint and authentication (see `api` table in config.toml).
    #[serde(default)]
    pub api: ApiConfig,

    /// Polling cadence (see `waiter` table in config.toml).
    #[serde(default)]
    pub waiter: WaiterConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    ///
    /// Note: this does **not** validate the API credentials. Binaries should call
    /// `Config::from_toml()` instead.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }

    /// Loads configuration from the TOML file (with defaults) and validates required fields.
    pub fn from_toml() -> Self {
        if !PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            panic!("config file not found: {DEFAULT_CONFIG_FILE}");
        }
        let cfg: Self = Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration from {DEFAULT_CONFIG_FILE}: {err}")
        });
        if cfg.api.auth.client_id.trim().is_empty() {
            panic!("api.auth.client_id must be set and non-empty");
        }
        if cfg.api.auth.client_secret.trim().is_empty() {
            panic!("api.auth.client_secret must be set and non-empty");
        }
        cfg
    }

    pub fn api(&self) -> ApiResolvedConfig {
        self.api.resolve()
    }

    pub fn waiter(&self) -> WaiterResolvedConfig {
        self.waiter.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Toml;
    use std::time::Duration;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.basic.loglevel, "info");
        assert_eq!(cfg.api.auth.flow, AuthFlow::PersonalAccessToken);

        let waiter = cfg.waiter();
        assert_eq!(waiter.backoff_initial, Duration::from_secs(1));
        assert_eq!(waiter.backoff_max, Duration::from_secs(30));
        assert_eq!(waiter.timeout, None);
    }

    #[test]
    fn optional_load_without_file_yields_defaults() {
        // The crate root carries no config.toml.
        let cfg = Config::from_optional_toml();
        assert_eq!(cfg.api.auth.client_id, "");
        assert_eq!(cfg.waiter().detection_interval, Duration::from_secs(5));
    }

    #[test]
    fn toml_overrides_are_merged_over_defaults() {
        let raw = r#"
            [api]
            base_url = "https://cloud.example.test/api/"

            [api.auth]
            flow = "client_credentials"
            client_id = "id-1"
            client_secret = 42
            scopes = ["compute", "backup"]

            [waiter]
            backoff_max_secs = 10
            timeout_secs = 600
        "#;

        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(raw))
            .extract()
            .expect("valid config");

        assert_eq!(cfg.api.auth.flow, AuthFlow::ClientCredentials);
        assert_eq!(cfg.api.auth.client_secret, "42");
        assert_eq!(cfg.api.auth.scopes, vec!["compute", "backup"]);

        let api = cfg.api();
        assert_eq!(api.base_url.as_str(), "https://cloud.example.test/api/");
        assert_eq!(
            api.auth.token_url.as_str(),
            "https://shiva.cloud-temple.com/api/iam/v2/auth/personal_access_token"
        );

        let waiter = cfg.waiter();
        assert_eq!(waiter.backoff_initial, Duration::from_secs(1));
        assert_eq!(waiter.backoff_max, Duration::from_secs(10));
        assert_eq!(waiter.timeout, Some(Duration::from_secs(600)));
    }
}
