//! Turning gateway requests into a single JSON object.
//!
//! The gateway posts form bodies, the browser return may arrive as a GET with
//! a query string, and some integrations send JSON. Fields from the query
//! string are merged first; body fields win on conflict.

use axum::http::{HeaderMap, header};
use serde_json::{Map, Value};

fn merge_form(target: &mut Map<String, Value>, input: &[u8]) {
    for (key, value) in url::form_urlencoded::parse(input) {
        target.insert(key.into_owned(), Value::String(value.into_owned()));
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("application/json"))
}

/// Merge the query string and request body into one JSON object.
///
/// A JSON body that is not an object is ignored; undecodable bodies are
/// treated as form data.
pub(crate) fn parse_gateway_payload(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Value {
    let mut merged = Map::new();
    if let Some(query) = query {
        merge_form(&mut merged, query.as_bytes());
    }

    let body_is_json = is_json(headers) || body.first() == Some(&b'{');
    if body_is_json {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => merged.extend(object),
            Ok(_) => {}
            Err(_) => merge_form(&mut merged, body),
        }
    } else if !body.is_empty() {
        merge_form(&mut merged, body);
    }

    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_form_body_with_bracketed_keys() {
        let body = b"cart_id=SC-PRE-1_abc&payment_result%5Bresponse_status%5D=A&tran_ref=T+1";
        let payload = parse_gateway_payload(None, &headers("application/x-www-form-urlencoded"), body);
        assert_eq!(payload["cart_id"], "SC-PRE-1_abc");
        assert_eq!(payload["payment_result[response_status]"], "A");
        assert_eq!(payload["tran_ref"], "T 1");
    }

    #[test]
    fn test_json_body_keeps_nesting() {
        let body = br#"{"cartId":"SC-PRE-1_abc","paymentResult":{"responseCode":0}}"#;
        let payload = parse_gateway_payload(None, &headers("application/json; charset=utf-8"), body);
        assert_eq!(payload["paymentResult"], json!({ "responseCode": 0 }));
    }

    #[test]
    fn test_query_merged_with_body_winning() {
        let payload = parse_gateway_payload(
            Some("cart_id=SC-PRE-1_abc&respStatus=H"),
            &HeaderMap::new(),
            b"respStatus=A",
        );
        assert_eq!(payload, json!({ "cart_id": "SC-PRE-1_abc", "respStatus": "A" }));
    }

    #[test]
    fn test_empty_request_is_empty_object() {
        assert_eq!(parse_gateway_payload(None, &HeaderMap::new(), b""), json!({}));
    }
}
