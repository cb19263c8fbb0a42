use crate::utils::jwt::{decode_jwt_claims, string_claim};
use serde_json::Value;

/// Bearer token plus the claims decoded from it.
///
/// Immutable once fetched; shared behind an `Arc` by [`super::CredentialCache`].
#[derive(Clone)]
pub struct Credential {
    token: String,
    claims: Option<Value>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let claims = decode_jwt_claims(&token);
        Self { token, claims }
    }

    /// Raw token, as sent in `Authorization: Bearer <token>`.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> Option<&Value> {
        self.claims.as_ref()
    }

    /// Subject of the token, i.e. the user the API key belongs to.
    pub fn user_id(&self) -> Option<&str> {
        string_claim(self.claims.as_ref()?, "sub")
    }

    pub fn tenant_id(&self) -> Option<&str> {
        string_claim(self.claims.as_ref()?, "tenant")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id())
            .field("tenant_id", &self.tenant_id())
            .finish()
    }
}
