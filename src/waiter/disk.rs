use super::context::WaitContext;
use super::engine::{Classifier, PollOutcome, Poller, Progress};
use crate::error::StratusError;
use crate::transport::{ApiClient, OperationHandle};
use stratus_schema::VirtualDisk;

/// A disk is done as soon as the inventory lists it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskInventoryClassifier;

impl Classifier for DiskInventoryClassifier {
    type Snapshot = VirtualDisk;
    type Output = VirtualDisk;
    const KIND: &'static str = "virtual disk";

    fn classify(&self, _handle: &OperationHandle, disk: VirtualDisk) -> PollOutcome<VirtualDisk> {
        PollOutcome::Done(disk)
    }

    // The backend is still materializing the disk, however many reads came back empty.
    fn classify_absent(
        &self,
        _handle: &OperationHandle,
        _observed: bool,
    ) -> PollOutcome<VirtualDisk> {
        PollOutcome::Pending(Progress::NotYetVisible)
    }
}

#[derive(Clone)]
pub struct DiskInventoryWaiter {
    client: ApiClient,
    poller: Poller,
}

impl DiskInventoryWaiter {
    pub fn new(client: ApiClient, poller: Poller) -> Self {
        Self { client, poller }
    }

    /// Wait until the disk with id `disk_id` shows up in the inventory.
    pub async fn wait(
        &self,
        ctx: &WaitContext,
        disk_id: &OperationHandle,
    ) -> Result<VirtualDisk, StratusError> {
        self.poller
            .poll(
                ctx,
                disk_id,
                move |id| async move { self.client.read_virtual_disk(id.as_str()).await },
                &DiskInventoryClassifier,
            )
            .await
    }
}
