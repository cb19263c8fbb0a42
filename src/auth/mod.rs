mod cache;
mod credential;
mod source;

pub use cache::CredentialCache;
pub use credential::Credential;
pub use source::{ClientCredentialsSource, PersonalAccessTokenSource, TokenSource};
