use base64::Engine as _;
use serde_json::Value;

/// Decode the claims of a bearer token without checking its signature.
///
/// Only the payload segment is base64url-decoded and parsed as JSON; opaque (non-JWT) tokens yield
/// `None`.
pub(crate) fn decode_jwt_claims(jwt: &str) -> Option<Value> {
    let payload_b64 = jwt.split('.').nth(1)?;

    // Padding is optional depending on the issuer.
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(payload_b64))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

/// Read a string claim.
pub(crate) fn string_claim<'a>(claims: &'a Value, key: &str) -> Option<&'a str> {
    claims.get(key).and_then(Value::as_str)
}

#[cfg(test)]
pub(crate) fn make_jwt(payload: &Value) -> String {
    let header = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload_bytes = serde_json::to_vec(payload).expect("serialize payload");
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload_bytes);
    format!("{header}.{payload_b64}.sig")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_payload_claims() {
        let jwt = make_jwt(&json!({ "sub": "user-1", "tenant": "t-1" }));
        let claims = decode_jwt_claims(&jwt).expect("claims");
        assert_eq!(string_claim(&claims, "sub"), Some("user-1"));
        assert_eq!(string_claim(&claims, "tenant"), Some("t-1"));
        assert_eq!(string_claim(&claims, "email"), None);
    }

    #[test]
    fn opaque_tokens_have_no_claims() {
        assert!(decode_jwt_claims("not-a-jwt").is_none());
        assert!(decode_jwt_claims("a.%%%.c").is_none());
    }
}
