//! Waiting for asynchronous backend operations.
//!
//! Mutating calls return a handle immediately; the actual work happens in the background. The
//! [`Poller`] re-reads a status resource with a Fibonacci backoff until a [`Classifier`] reports
//! a terminal state. Guest-tools detection uses the fixed-interval [`DetectionWaiter`] instead.

mod activity;
mod backoff;
mod backup_job;
mod context;
mod detection;
mod disk;
mod engine;
mod policy;

pub use activity::{ActivityClassifier, ActivityWaiter};
pub use backoff::{FibonacciBackoff, FibonacciDelays};
pub use backup_job::{BackupJobClassifier, BackupJobWaiter};
pub use context::WaitContext;
pub use detection::{Detection, DetectionWaiter, GuestToolsWaiter};
pub use disk::{DiskInventoryClassifier, DiskInventoryWaiter};
pub use engine::{Classifier, PollOutcome, Poller, Progress};
pub use policy::{TracingPolicy, WaiterPolicy};

use crate::config::WaiterResolvedConfig;
use crate::transport::ApiClient;
use std::sync::Arc;
use tracing::info;

/// All waiters sharing one client and one polling cadence.
#[derive(Clone)]
pub struct Waiters {
    pub activity: ActivityWaiter,
    pub backup_job: BackupJobWaiter,
    pub disk: DiskInventoryWaiter,
    pub guest_tools: GuestToolsWaiter,
    pub cfg: Arc<WaiterResolvedConfig>,
}

impl Waiters {
    pub fn new(client: &ApiClient, cfg: WaiterResolvedConfig) -> Self {
        info!(
            backoff_initial = ?cfg.backoff_initial,
            backoff_max = ?cfg.backoff_max,
            detection_interval = ?cfg.detection_interval,
            detection_timeout = ?cfg.detection_timeout,
            timeout = ?cfg.timeout,
            "Waiter config (effective)"
        );

        let poller = Poller::new(FibonacciBackoff::new(cfg.backoff_initial, cfg.backoff_max));
        let detection = DetectionWaiter::new(cfg.detection_interval, cfg.detection_timeout);

        Self {
            activity: ActivityWaiter::new(client.clone(), poller.clone()),
            backup_job: BackupJobWaiter::new(client.clone(), poller.clone()),
            disk: DiskInventoryWaiter::new(client.clone(), poller),
            guest_tools: GuestToolsWaiter::new(client.clone(), detection),
            cfg: Arc::new(cfg),
        }
    }

    /// Same waiters, with `policy` applied to every poll-based wait.
    #[must_use]
    pub fn with_policy(self, client: &ApiClient, policy: Arc<dyn WaiterPolicy>) -> Self {
        let poller = Poller::new(FibonacciBackoff::new(
            self.cfg.backoff_initial,
            self.cfg.backoff_max,
        ))
        .with_policy(policy);

        Self {
            activity: ActivityWaiter::new(client.clone(), poller.clone()),
            backup_job: BackupJobWaiter::new(client.clone(), poller.clone()),
            disk: DiskInventoryWaiter::new(client.clone(), poller),
            ..self
        }
    }
}
