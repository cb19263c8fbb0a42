use crate::error::StratusError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation scope of a wait: an explicit cancel signal plus an optional deadline.
///
/// Clones share the cancel signal. A wait observes the context at its two suspension points,
/// the status read and the sleep between reads, and returns [`StratusError::Cancelled`] or
/// [`StratusError::DeadlineExceeded`] as soon as it fires.
#[derive(Debug, Clone, Default)]
pub struct WaitContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl WaitContext {
    /// No deadline; only an explicit [`WaitContext::cancel`] ends the wait early.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that is cancelled with `self` and can also be cancelled on its own.
    /// The tighter of the two deadlines applies.
    #[must_use]
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail immediately if the context is already done.
    pub fn check(&self) -> Result<(), StratusError> {
        if self.cancel.is_cancelled() {
            return Err(StratusError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(StratusError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> StratusError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.cancel.cancelled() => StratusError::Cancelled,
                () = tokio::time::sleep_until(deadline) => StratusError::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                StratusError::Cancelled
            }
        }
    }

    /// Drive `fut` unless the context finishes first, in which case `fut` is dropped.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, StratusError> {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<(), StratusError> {
        self.run(tokio::time::sleep(duration)).await
    }
}
