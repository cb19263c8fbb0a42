use super::context::WaitContext;
use super::engine::{Classifier, PollOutcome, Poller, Progress};
use crate::error::StratusError;
use crate::transport::{ApiClient, OperationHandle};
use crate::utils::logging::with_pretty_json_debug;
use futures::future::try_join_all;
use stratus_schema::Activity;
use stratus_schema::activity::{ACTIVITY_STATE_COMPLETED, ACTIVITY_STATE_FAILED};
use tracing::debug;

/// Status vocabulary of activities: the single key of `state` names the status.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityClassifier;

impl Classifier for ActivityClassifier {
    type Snapshot = Activity;
    type Output = Activity;
    const KIND: &'static str = "activity";

    fn classify(&self, handle: &OperationHandle, activity: Activity) -> PollOutcome<Activity> {
        with_pretty_json_debug(&activity, |pretty| {
            debug!(%handle, snapshot = %pretty, "Activity snapshot");
        });

        if activity.state.len() != 1 {
            let keys: Vec<&str> = activity.state.keys().map(String::as_str).collect();
            return PollOutcome::Pending(Progress::Malformed(format!(
                "expected exactly one state, got {} {:?}",
                keys.len(),
                keys
            )));
        }

        let Some((status, state)) = activity.single_state() else {
            return PollOutcome::Pending(Progress::Malformed("missing state".to_string()));
        };

        match status {
            ACTIVITY_STATE_COMPLETED => PollOutcome::Done(activity),
            ACTIVITY_STATE_FAILED => {
                let reason = state
                    .reason
                    .as_deref()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or("no reason given")
                    .to_string();
                PollOutcome::Failed(StratusError::OperationFailed {
                    kind: Self::KIND,
                    handle: handle.to_string(),
                    reason,
                })
            }
            other => {
                let detail = match state.progression {
                    Some(pct) => format!("{other} ({pct:.0}%)"),
                    None => other.to_string(),
                };
                PollOutcome::Pending(Progress::InFlight(detail))
            }
        }
    }
}

/// Waits for activities returned by mutating calls.
#[derive(Clone)]
pub struct ActivityWaiter {
    client: ApiClient,
    poller: Poller,
}

impl ActivityWaiter {
    pub fn new(client: ApiClient, poller: Poller) -> Self {
        Self { client, poller }
    }

    /// Wait until the activity completes; returns the final snapshot.
    pub async fn wait(
        &self,
        ctx: &WaitContext,
        handle: &OperationHandle,
    ) -> Result<Activity, StratusError> {
        self.poller
            .poll(
                ctx,
                handle,
                move |handle| async move { self.client.read_activity(&handle).await },
                &ActivityClassifier,
            )
            .await
    }

    /// Wait for several activities concurrently, each with its own independent poll loop.
    ///
    /// Fails as soon as one of them fails; the remaining waits are dropped.
    pub async fn wait_all(
        &self,
        ctx: &WaitContext,
        handles: &[OperationHandle],
    ) -> Result<Vec<Activity>, StratusError> {
        try_join_all(handles.iter().map(|handle| self.wait(ctx, handle))).await
    }
}
