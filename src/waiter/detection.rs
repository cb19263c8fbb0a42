use super::context::WaitContext;
use crate::error::StratusError;
use crate::transport::{ApiClient, OperationHandle};
use std::future::Future;
use std::time::Duration;
use stratus_schema::VirtualMachine;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Result of a detection wait. Running out of time is not an error.
#[derive(Debug)]
pub enum Detection<S> {
    Detected(S),
    /// Last snapshot seen before the timeout, if any read found the resource.
    TimedOut(Option<S>),
}

impl<S> Detection<S> {
    pub fn is_detected(&self) -> bool {
        matches!(self, Detection::Detected(_))
    }

    pub fn into_snapshot(self) -> Option<S> {
        match self {
            Detection::Detected(snapshot) => Some(snapshot),
            Detection::TimedOut(last) => last,
        }
    }
}

/// Fixed-interval polling bounded by its own timeout.
///
/// Unlike [`super::Poller`] there is no backoff and no terminal classification: reads repeat
/// every `interval` until `detected` holds or `timeout` elapses, in which case the last snapshot
/// is returned. Snapshots that do not decode are skipped. Cancellation of the [`WaitContext`] and
/// other read errors are still errors.
#[derive(Debug, Clone, Copy)]
pub struct DetectionWaiter {
    interval: Duration,
    timeout: Duration,
}

impl DetectionWaiter {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub async fn wait<S, R, Fut, P>(
        &self,
        ctx: &WaitContext,
        handle: &OperationHandle,
        mut read: R,
        detected: P,
    ) -> Result<Detection<S>, StratusError>
    where
        R: FnMut(OperationHandle) -> Fut,
        Fut: Future<Output = Result<Option<S>, StratusError>>,
        P: Fn(&S) -> bool,
    {
        ctx.check()?;

        let timeout = tokio::time::sleep(self.timeout);
        tokio::pin!(timeout);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last = None;
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                () = &mut timeout => break,
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let snapshot = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                () = &mut timeout => break,
                res = read(handle.clone()) => res,
            };

            let snapshot = match snapshot {
                Err(StratusError::MalformedSnapshot { detail, .. }) => {
                    warn!(%handle, attempt, %detail, "Malformed snapshot, detection goes on");
                    continue;
                }
                other => other?,
            };

            match snapshot {
                Some(snapshot) if detected(&snapshot) => {
                    info!(%handle, attempts = attempt, "Detection succeeded");
                    return Ok(Detection::Detected(snapshot));
                }
                Some(snapshot) => {
                    debug!(%handle, attempt, "Not detected yet");
                    last = Some(snapshot);
                }
                None => debug!(%handle, attempt, "Resource not visible yet"),
            }
        }

        info!(
            %handle,
            attempts = attempt,
            timeout = ?self.timeout,
            "Detection timed out, keeping last snapshot"
        );
        Ok(Detection::TimedOut(last))
    }
}

/// Waits for the guest tools (paravirtual drivers and management agent) of a VM to report in.
#[derive(Clone)]
pub struct GuestToolsWaiter {
    client: ApiClient,
    detection: DetectionWaiter,
}

impl GuestToolsWaiter {
    pub fn new(client: ApiClient, detection: DetectionWaiter) -> Self {
        Self { client, detection }
    }

    pub async fn wait(
        &self,
        ctx: &WaitContext,
        vm_id: &OperationHandle,
    ) -> Result<Detection<VirtualMachine>, StratusError> {
        self.detection
            .wait(
                ctx,
                vm_id,
                move |id| async move { self.client.read_virtual_machine(id.as_str()).await },
                VirtualMachine::tools_detected,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_schema::{ManagementAgent, PvDrivers};
    use tokio::time::Instant;

    fn vm(detected: bool) -> VirtualMachine {
        VirtualMachine {
            id: "vm-1".to_string(),
            pv_drivers: PvDrivers {
                detected,
                ..Default::default()
            },
            management_agent: ManagementAgent { detected },
            ..Default::default()
        }
    }

    fn waiter() -> DetectionWaiter {
        DetectionWaiter::new(Duration::from_secs(5), Duration::from_secs(12))
    }

    fn handle() -> OperationHandle {
        OperationHandle::new("vm-1").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn detects_on_a_fixed_interval() {
        let mut reads = 0;
        let started = Instant::now();
        let outcome = waiter()
            .wait(
                &WaitContext::new(),
                &handle(),
                |_| {
                    reads += 1;
                    let snapshot = vm(reads == 3);
                    async move { Ok(Some(snapshot)) }
                },
                VirtualMachine::tools_detected,
            )
            .await
            .expect("no error");

        assert!(outcome.is_detected());
        assert_eq!(reads, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_returns_last_snapshot_without_error() {
        let mut reads = 0;
        let started = Instant::now();
        let outcome = waiter()
            .wait(
                &WaitContext::new(),
                &handle(),
                |_| {
                    reads += 1;
                    async move { Ok(Some(vm(false))) }
                },
                VirtualMachine::tools_detected,
            )
            .await
            .expect("timeout is not an error");

        assert!(!outcome.is_detected());
        assert_eq!(reads, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(12));
        assert_eq!(outcome.into_snapshot().map(|vm| vm.id), Some("vm-1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_without_any_snapshot() {
        let outcome = waiter()
            .wait(
                &WaitContext::new(),
                &handle(),
                |_| async { Ok(None::<VirtualMachine>) },
                VirtualMachine::tools_detected,
            )
            .await
            .expect("timeout is not an error");
        assert!(matches!(outcome, Detection::TimedOut(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn context_deadline_is_still_an_error() {
        let ctx = WaitContext::with_timeout(Duration::from_secs(7));
        let err = waiter()
            .wait(
                &ctx,
                &handle(),
                |_| async { Ok(Some(vm(false))) },
                VirtualMachine::tools_detected,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StratusError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_snapshot_is_skipped() {
        let mut reads = 0;
        let outcome = waiter()
            .wait(
                &WaitContext::new(),
                &handle(),
                |_| {
                    reads += 1;
                    let result = if reads == 1 {
                        Err(StratusError::MalformedSnapshot {
                            kind: "virtual machine",
                            handle: "vm-1".to_string(),
                            detail: "missing field `id`".to_string(),
                        })
                    } else {
                        Ok(Some(vm(true)))
                    };
                    async move { result }
                },
                VirtualMachine::tools_detected,
            )
            .await
            .expect("malformed snapshot is not an error");

        assert!(outcome.is_detected());
        assert_eq!(reads, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn read_errors_are_propagated() {
        let err = waiter()
            .wait(
                &WaitContext::new(),
                &handle(),
                |_| async {
                    Err::<Option<VirtualMachine>, _>(StratusError::Unexpected("boom".to_string()))
                },
                VirtualMachine::tools_detected,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StratusError::Unexpected(_)));
    }
}
