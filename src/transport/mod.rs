mod classify;
mod client;
mod endpoints;
mod handle;
mod http;
mod request;

pub use classify::{require_found_or_not_found, require_ok};
pub use client::ApiClient;
pub use endpoints::{ACTIVITY, BACKUP_JOB, ResourceEndpoint, VIRTUAL_DISK, VIRTUAL_MACHINE};
pub use handle::OperationHandle;
pub use http::build_http_client;
pub use request::ApiRequest;
