//! Request signing for the Xiaohongshu ark open API
//!
//! The upstream recomputes the signature over the same parameters, so the
//! canonical form has to match byte for byte: empty values dropped, keys
//! sorted, `key=value` pairs joined with `&`, then HMAC-SHA256 in lowercase hex.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parameters of a signed request, keyed by wire name
pub type SignablePayload = Map<String, Value>;

/// Build the canonical query string that gets signed.
///
/// Keys whose value is `null` or `""` are skipped. Arrays and objects are
/// rendered as compact JSON, everything else as plain text.
pub fn canonical_query(parameters: &SignablePayload) -> String {
    let mut entries: Vec<(&String, String)> = parameters
        .iter()
        .filter_map(|(key, value)| render_value(value).map(|rendered| (key, rendered)))
        .collect();

    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    entries
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign `parameters` with `secret`, returning the lowercase hex digest
pub fn sign(parameters: &SignablePayload, secret: &str) -> String {
    let query = canonical_query(parameters);
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> SignablePayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_canonical_query_sorts_and_filters() {
        let params = payload(json!({
            "type": "IMAGE",
            "name": "a",
            "empty": "",
            "missing": null,
        }));
        assert_eq!(canonical_query(&params), "name=a&type=IMAGE");
    }

    #[test]
    fn test_canonical_query_renders_arrays_as_compact_json() {
        let params = payload(json!({
            "materialContent": ["aGVsbG8=", "d29ybGQ="],
            "timestamp": "1700000000",
        }));
        assert_eq!(
            canonical_query(&params),
            r#"materialContent=["aGVsbG8=","d29ybGQ="]&timestamp=1700000000"#
        );
    }

    #[test]
    fn test_canonical_query_renders_numbers_and_bools() {
        let params = payload(json!({ "count": 3, "ratio": 1.5, "flag": true }));
        assert_eq!(canonical_query(&params), "count=3&flag=true&ratio=1.5");
    }

    #[test]
    fn test_canonical_query_uses_byte_order() {
        // Uppercase sorts before lowercase in byte order
        let params = payload(json!({ "b": "1", "B": "2", "a": "3" }));
        assert_eq!(canonical_query(&params), "B=2&a=3&b=1");
    }

    #[test]
    fn test_sign_known_vector() {
        let params = payload(json!({ "name": "a", "type": "IMAGE" }));
        assert_eq!(
            sign(&params, "k"),
            "39302b61b0627dd96040d5a2411da4b187a3d6743401eedbc359d2ade15b5d34"
        );
    }

    #[test]
    fn test_sign_known_vector_with_array() {
        let params = payload(json!({
            "appId": "app",
            "materialContent": ["aGVsbG8="],
            "timestamp": "1700000000",
        }));
        assert_eq!(
            sign(&params, "secret"),
            "19b7b2d85a7b53ccb296de58e86494be0e88b44549d26076a2463659f7433454"
        );
    }

    #[test]
    fn test_sign_ignores_empty_values_and_order() {
        let noisy = payload(json!({
            "name": "a",
            "type": "IMAGE",
            "empty": "",
            "missing": null,
        }));
        let clean = payload(json!({ "type": "IMAGE", "name": "a" }));
        assert_eq!(sign(&noisy, "k"), sign(&clean, "k"));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let params = payload(json!({ "name": "photo", "timestamp": "1" }));
        let first = sign(&params, "secret");
        for _ in 0..10 {
            assert_eq!(sign(&params, "secret"), first);
        }
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let params = payload(json!({ "name": "photo" }));
        assert_ne!(sign(&params, "secret1"), sign(&params, "secret2"));
    }

    #[test]
    fn test_sign_is_lowercase_hex() {
        let params = payload(json!({ "name": "photo" }));
        let signature = sign(&params, "secret");
        assert_eq!(signature.len(), 64);
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_sign_empty_payload() {
        let params = SignablePayload::new();
        assert_eq!(canonical_query(&params), "");
        assert_eq!(sign(&params, "k").len(), 64);
    }
}
