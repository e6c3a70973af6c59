use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// Decodes the payload segment of a JWT into its JSON claims.
///
/// The signature is NOT verified. Claims are only read to derive display
/// values and request headers; no key is available to check them against,
/// and nothing here makes a trust decision based on them.
pub fn decode_jwt_claims(token: &str) -> Option<Value> {
    let mut segments = token.trim().split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;

    let mut standard = payload.replace('-', "+").replace('_', "/");
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    let bytes = STANDARD.decode(standard.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Claims from an `id_token` field that is either already decoded or a raw JWT.
pub(crate) fn id_token_claims(id_token: &Value) -> Option<Value> {
    match id_token {
        Value::Object(_) => Some(id_token.clone()),
        Value::String(token) => decode_jwt_claims(token).filter(Value::is_object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn fake_jwt(payload: &Value) -> String {
        let b64 = |bytes: &[u8]| URL_SAFE_NO_PAD.encode(bytes);
        format!(
            "{}.{}.{}",
            b64(br#"{"alg":"none","typ":"JWT"}"#),
            b64(&serde_json::to_vec(payload).unwrap()),
            b64(b"sig")
        )
    }

    #[test]
    fn decodes_url_safe_payload_without_padding() {
        let token = fake_jwt(&json!({"chatgpt_account_id": "acct_123"}));
        let claims = decode_jwt_claims(&token).unwrap();
        assert_eq!(claims["chatgpt_account_id"], "acct_123");
    }

    #[test]
    fn decodes_payload_with_url_safe_characters() {
        let token = fake_jwt(&json!({"note": "?>?>?>", "n": 1}));
        assert_eq!(decode_jwt_claims(&token).unwrap()["note"], "?>?>?>");
    }

    #[test]
    fn malformed_tokens_yield_none() {
        assert_eq!(decode_jwt_claims("no-separator-here"), None);
        assert_eq!(decode_jwt_claims("a.%%%.c"), None);
        assert_eq!(decode_jwt_claims(""), None);

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"plain text"));
        assert_eq!(decode_jwt_claims(&not_json), None);
    }

    #[test]
    fn id_token_objects_are_used_directly() {
        let claims = id_token_claims(&json!({"chatgpt_account_id": "acct_9"})).unwrap();
        assert_eq!(claims["chatgpt_account_id"], "acct_9");
        assert_eq!(id_token_claims(&json!(42)), None);
    }
}
