use serde::{Deserialize, Serialize};

/// Job is idle again: the last run has finished.
pub const JOB_STATUS_IDLE: &str = "IDLE";
/// Job is currently executing.
pub const JOB_STATUS_RUNNING: &str = "RUNNING";

/// Backup job, as returned by `GET .../jobs/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupJob {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub status: String,
}
