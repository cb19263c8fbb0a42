mod oauth;
mod status;
mod stratus;

pub use oauth::OauthError;
pub use status::StatusError;
pub use stratus::StratusError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
