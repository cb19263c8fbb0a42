use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling cadence managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaiterConfig {
    /// First delay of the Fibonacci backoff between status reads.
    /// TOML: `waiter.backoff_initial_secs`. Default: `1`.
    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,

    /// Cap of the Fibonacci backoff.
    /// TOML: `waiter.backoff_max_secs`. Default: `30`.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Fixed interval of the guest-tools detection loop.
    /// TOML: `waiter.detection_interval_secs`. Default: `5`.
    #[serde(default = "default_detection_interval_secs")]
    pub detection_interval_secs: u64,

    /// How long guest-tools detection keeps trying before settling for the last snapshot.
    /// TOML: `waiter.detection_timeout_secs`. Default: `120`.
    #[serde(default = "default_detection_timeout_secs")]
    pub detection_timeout_secs: u64,

    /// Overall deadline applied by the binary to a wait. Unset means wait until cancelled.
    /// TOML: `waiter.timeout_secs`.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct WaiterResolvedConfig {
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub detection_interval: Duration,
    pub detection_timeout: Duration,
    pub timeout: Option<Duration>,
}

impl WaiterConfig {
    pub fn resolve(&self) -> WaiterResolvedConfig {
        let backoff_initial = Duration::from_secs(self.backoff_initial_secs.max(1));
        WaiterResolvedConfig {
            backoff_initial,
            backoff_max: Duration::from_secs(self.backoff_max_secs).max(backoff_initial),
            detection_interval: Duration::from_secs(self.detection_interval_secs.max(1)),
            detection_timeout: Duration::from_secs(self.detection_timeout_secs),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            backoff_initial_secs: default_backoff_initial_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            detection_interval_secs: default_detection_interval_secs(),
            detection_timeout_secs: default_detection_timeout_secs(),
            timeout_secs: None,
        }
    }
}

impl Default for WaiterResolvedConfig {
    fn default() -> Self {
        WaiterConfig::default().resolve()
    }
}

fn default_backoff_initial_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    30
}

fn default_detection_interval_secs() -> u64 {
    5
}

fn default_detection_timeout_secs() -> u64 {
    120
}
