use serde::{Deserialize, Serialize};

/// Basic (process-level) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization, e.g. "info" or "debug".
    /// TOML: `basic.loglevel`. Default: `info`. `RUST_LOG` takes precedence when set.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
        }
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}
