pub mod activity;
pub mod backup;
pub mod compute;
pub mod envelope;

pub use activity::{Activity, ActivityState, ConcernedItem};
pub use backup::{BackupJob, JOB_STATUS_IDLE, JOB_STATUS_RUNNING};
pub use compute::{ManagementAgent, PvDrivers, VirtualDisk, VirtualMachine};
pub use envelope::HandleEnvelope;
