use crate::error::StratusError;
use tracing::info;

/// Caller-supplied hooks applied on every poll attempt.
///
/// `retryable` sees a descriptive error for each non-terminal attempt (still running, not visible
/// yet, malformed snapshot); `terminal` sees the error a wait is about to return. Both may rewrap
/// the error but cannot turn a terminal failure into success, since the poller returns whatever
/// `terminal` yields as an `Err`. Cancellation errors bypass the policy.
pub trait WaiterPolicy: Send + Sync {
    fn log(&self, message: &str);

    fn retryable(&self, err: StratusError) -> StratusError {
        err
    }

    fn terminal(&self, err: StratusError) -> StratusError {
        err
    }
}

/// Logs every attempt at INFO under a caller-chosen label.
#[derive(Debug, Clone)]
pub struct TracingPolicy {
    label: String,
}

impl TracingPolicy {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl WaiterPolicy for TracingPolicy {
    fn log(&self, message: &str) {
        info!(label = %self.label, "{message}");
    }
}
