use super::backoff::FibonacciBackoff;
use super::context::WaitContext;
use super::policy::WaiterPolicy;
use crate::error::StratusError;
use crate::transport::OperationHandle;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a poll is not finished yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The backend reports the operation as running.
    InFlight(String),
    /// The handle does not resolve yet.
    NotYetVisible,
    /// The snapshot did not have the expected shape; polling goes on.
    Malformed(String),
}

impl Progress {
    fn into_error(self, kind: &'static str, handle: &OperationHandle) -> StratusError {
        let handle = handle.to_string();
        match self {
            Progress::InFlight(detail) => StratusError::Pending {
                kind,
                handle,
                detail,
            },
            Progress::NotYetVisible => StratusError::Pending {
                kind,
                handle,
                detail: "not visible yet".to_string(),
            },
            Progress::Malformed(detail) => StratusError::MalformedSnapshot {
                kind,
                handle,
                detail,
            },
        }
    }
}

/// Classification of one status snapshot.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Pending(Progress),
    Done(T),
    Failed(StratusError),
}

/// Resource-specific status vocabulary plugged into [`Poller::poll`].
pub trait Classifier: Send + Sync {
    type Snapshot;
    type Output;

    /// Kind named in logs and errors.
    const KIND: &'static str;

    fn classify(
        &self,
        handle: &OperationHandle,
        snapshot: Self::Snapshot,
    ) -> PollOutcome<Self::Output>;

    /// The read found nothing. `observed` tells whether an earlier read did find the resource.
    ///
    /// A handle may lag behind the call that returned it, so absence is pending until the
    /// resource has been seen once; disappearing afterwards is a failure.
    fn classify_absent(
        &self,
        handle: &OperationHandle,
        observed: bool,
    ) -> PollOutcome<Self::Output> {
        if observed {
            PollOutcome::Failed(StratusError::Vanished {
                kind: Self::KIND,
                handle: handle.to_string(),
            })
        } else {
            PollOutcome::Pending(Progress::NotYetVisible)
        }
    }

    /// The read itself failed. A snapshot that did not decode keeps polling; anything else is
    /// terminal unless overridden.
    fn classify_error(
        &self,
        _handle: &OperationHandle,
        err: StratusError,
    ) -> PollOutcome<Self::Output> {
        match err {
            StratusError::MalformedSnapshot { detail, .. } => {
                PollOutcome::Pending(Progress::Malformed(detail))
            }
            err => PollOutcome::Failed(err),
        }
    }
}

/// Drives a read/classify loop until the operation reaches a terminal state.
///
/// There is no attempt limit: the [`WaitContext`] bounds the total wait.
#[derive(Clone, Default)]
pub struct Poller {
    backoff: FibonacciBackoff,
    policy: Option<Arc<dyn WaiterPolicy>>,
}

impl Poller {
    pub fn new(backoff: FibonacciBackoff) -> Self {
        Self {
            backoff,
            policy: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn WaiterPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Poll `handle` through `read` until `classifier` reports `Done` or `Failed`.
    ///
    /// `read` returns `Ok(None)` when the handle does not resolve. Reads are strictly sequential.
    /// Cancellation is checked around every read and sleep and returned unchanged.
    pub async fn poll<C, R, Fut>(
        &self,
        ctx: &WaitContext,
        handle: &OperationHandle,
        mut read: R,
        classifier: &C,
    ) -> Result<C::Output, StratusError>
    where
        C: Classifier,
        R: FnMut(OperationHandle) -> Fut,
        Fut: Future<Output = Result<Option<C::Snapshot>, StratusError>>,
    {
        let started = Instant::now();
        let mut delays = self.backoff.delays();
        let mut attempt: u32 = 0;
        let mut observed = false;

        loop {
            attempt += 1;
            let outcome = match ctx.run(read(handle.clone())).await? {
                Ok(Some(snapshot)) => {
                    observed = true;
                    classifier.classify(handle, snapshot)
                }
                Ok(None) => classifier.classify_absent(handle, observed),
                Err(err) => classifier.classify_error(handle, err),
            };

            match outcome {
                PollOutcome::Done(value) => {
                    info!(
                        kind = C::KIND,
                        %handle,
                        attempts = attempt,
                        elapsed_ms =
                            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Operation finished"
                    );
                    return Ok(value);
                }
                PollOutcome::Failed(err) => {
                    warn!(
                        kind = C::KIND,
                        %handle,
                        attempts = attempt,
                        error = %err,
                        "Operation failed"
                    );
                    return Err(match &self.policy {
                        Some(policy) => policy.terminal(err),
                        None => err,
                    });
                }
                PollOutcome::Pending(progress) => {
                    let delay = delays.next().unwrap_or(self.backoff.max());
                    self.report_pending(C::KIND, handle, attempt, progress, delay);
                    ctx.sleep(delay).await?;
                }
            }
        }
    }

    fn report_pending(
        &self,
        kind: &'static str,
        handle: &OperationHandle,
        attempt: u32,
        progress: Progress,
        delay: Duration,
    ) {
        let malformed = matches!(progress, Progress::Malformed(_));
        let err = progress.into_error(kind, handle);

        match &self.policy {
            Some(policy) => {
                let err = policy.retryable(err);
                policy.log(&format!("attempt {attempt}: {err}; next poll in {delay:?}"));
            }
            None if malformed => {
                warn!(
                    kind,
                    %handle,
                    attempt,
                    error = %err,
                    ?delay,
                    "Malformed snapshot, polling again"
                );
            }
            None => {
                debug!(kind, %handle, attempt, detail = %err, ?delay, "Operation pending");
            }
        }
    }
}
