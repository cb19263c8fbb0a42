use super::request::ApiRequest;
use reqwest::StatusCode;

/// Read endpoint of one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct ResourceEndpoint {
    /// Human-readable kind used in logs and errors.
    pub kind: &'static str,
    /// Path template with a single `{}` for the id.
    pub path: &'static str,
    /// Status the backend uses to say the resource does not exist.
    pub not_found: StatusCode,
}

impl ResourceEndpoint {
    pub fn request(&self, id: &str) -> ApiRequest {
        ApiRequest::get(self.path).arg(id)
    }
}

pub const ACTIVITY: ResourceEndpoint = ResourceEndpoint {
    kind: "activity",
    path: "activity/v1/activities/{}",
    not_found: StatusCode::NOT_FOUND,
};

pub const BACKUP_JOB: ResourceEndpoint = ResourceEndpoint {
    kind: "backup job",
    path: "backup/v1/jobs/{}",
    not_found: StatusCode::NOT_FOUND,
};

// The disk inventory answers 403 for ids it cannot see, existing or not.
pub const VIRTUAL_DISK: ResourceEndpoint = ResourceEndpoint {
    kind: "virtual disk",
    path: "compute/v1/vcenters/virtual_disks/{}",
    not_found: StatusCode::FORBIDDEN,
};

pub const VIRTUAL_MACHINE: ResourceEndpoint = ResourceEndpoint {
    kind: "virtual machine",
    path: "compute/v1/open_iaas/virtual_machines/{}",
    not_found: StatusCode::NOT_FOUND,
};
