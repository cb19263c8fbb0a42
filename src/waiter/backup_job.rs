use super::context::WaitContext;
use super::engine::{Classifier, PollOutcome, Poller, Progress};
use crate::error::StratusError;
use crate::transport::{ApiClient, OperationHandle};
use stratus_schema::{BackupJob, JOB_STATUS_IDLE, JOB_STATUS_RUNNING};

/// `IDLE` means the run finished, `RUNNING` means keep waiting, anything else is a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupJobClassifier;

impl Classifier for BackupJobClassifier {
    type Snapshot = BackupJob;
    type Output = BackupJob;
    const KIND: &'static str = "backup job";

    fn classify(&self, handle: &OperationHandle, job: BackupJob) -> PollOutcome<BackupJob> {
        match job.status.as_str() {
            JOB_STATUS_IDLE => PollOutcome::Done(job),
            JOB_STATUS_RUNNING => PollOutcome::Pending(Progress::InFlight(job.status)),
            other => PollOutcome::Failed(StratusError::OperationFailed {
                kind: Self::KIND,
                handle: handle.to_string(),
                reason: format!("unexpected job status {other:?}"),
            }),
        }
    }
}

#[derive(Clone)]
pub struct BackupJobWaiter {
    client: ApiClient,
    poller: Poller,
}

impl BackupJobWaiter {
    pub fn new(client: ApiClient, poller: Poller) -> Self {
        Self { client, poller }
    }

    /// Wait until the job is back to `IDLE`.
    pub async fn wait(
        &self,
        ctx: &WaitContext,
        handle: &OperationHandle,
    ) -> Result<BackupJob, StratusError> {
        self.poller
            .poll(
                ctx,
                handle,
                move |handle| async move { self.client.read_backup_job(&handle).await },
                &BackupJobClassifier,
            )
            .await
    }
}
