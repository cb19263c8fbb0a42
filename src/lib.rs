pub mod auth;
pub mod config;
pub mod error;
pub mod transport;
pub mod waiter;

mod utils;

pub use error::StratusError;
pub use transport::{ApiClient, OperationHandle};
pub use waiter::{WaitContext, Waiters};
