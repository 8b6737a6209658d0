//! Outbound proxy response.
//!
//! Every invocation returns exactly one [`ProxyResponse`]. HTTP cycles fill
//! it from the accumulated response; WebSocket cycles always return the
//! fixed acknowledgment.
//!
//! # Format
//!
//! ```json
//! {
//!   "statusCode": 200,
//!   "headers": { "content-type": "text/plain; charset=utf-8" },
//!   "body": "OK",
//!   "isBase64Encoded": false
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::cycle::HttpResponse;

// ============================================================================
// Constants
// ============================================================================

/// Content type of the WebSocket acknowledgment.
const ACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Body of the WebSocket acknowledgment.
const ACK_BODY: &str = "OK";

/// Content types that are always returned as text.
const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/javascript",
    "application/xml",
    "application/vnd.api+json",
];

// ============================================================================
// ProxyResponse
// ============================================================================

/// The single outbound event of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, String>,

    /// Headers that must keep every value (`set-cookie`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,

    /// Body, base64-encoded when `is_base64_encoded` is set.
    pub body: String,

    /// Whether `body` is base64-encoded.
    pub is_base64_encoded: bool,
}

impl ProxyResponse {
    /// Returns the fixed acknowledgment of WebSocket invocations.
    #[must_use]
    pub fn websocket_ack() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), ACK_CONTENT_TYPE.to_string());

        Self {
            status_code: 200,
            headers,
            multi_value_headers: BTreeMap::new(),
            body: ACK_BODY.to_string(),
            is_base64_encoded: false,
        }
    }

    /// Builds the outbound event of an HTTP cycle.
    ///
    /// `text_mime_types` lists extra content types returned as text.
    #[must_use]
    pub fn from_http(response: HttpResponse, text_mime_types: &[String]) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        let mut multi_value_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for header in &response.headers {
            let name = header.name().to_ascii_lowercase();
            let value = header.value().to_string();

            if name == "set-cookie" {
                multi_value_headers
                    .entry(name.clone())
                    .or_default()
                    .push(value.clone());
                headers.insert(name, value);
                continue;
            }

            headers
                .entry(name)
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let (body, is_base64_encoded) = encode_body(
            response.body,
            headers.get("content-type").map(String::as_str),
            headers.contains_key("content-encoding"),
            text_mime_types,
        );

        Self {
            status_code: response.status,
            headers,
            multi_value_headers,
            body,
            is_base64_encoded,
        }
    }

    /// Returns the body bytes, decoding base64 if flagged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Base64`](crate::Error::Base64) for an invalid
    /// base64 body.
    pub fn body_bytes(&self) -> crate::Result<Vec<u8>> {
        if self.is_base64_encoded {
            Ok(STANDARD.decode(&self.body)?)
        } else {
            Ok(self.body.as_bytes().to_vec())
        }
    }
}

// ============================================================================
// Body Encoding
// ============================================================================

/// Returns the body as text if possible, otherwise as base64.
fn encode_body(
    body: Vec<u8>,
    content_type: Option<&str>,
    has_content_encoding: bool,
    text_mime_types: &[String],
) -> (String, bool) {
    if body.is_empty() {
        return (String::new(), false);
    }

    let textual = !has_content_encoding
        && content_type.is_some_and(|ct| is_text_mime(ct, text_mime_types));

    if textual {
        match String::from_utf8(body) {
            Ok(text) => (text, false),
            Err(e) => (STANDARD.encode(e.into_bytes()), true),
        }
    } else {
        (STANDARD.encode(body), true)
    }
}

/// Returns `true` if `content_type` denotes text.
fn is_text_mime(content_type: &str, extra: &[String]) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.starts_with("text/")
        || mime.ends_with("+json")
        || mime.ends_with("+xml")
        || TEXT_MIME_TYPES.contains(&mime.as_str())
        || extra.iter().any(|t| t.eq_ignore_ascii_case(&mime))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::Header;

    fn response(headers: Vec<Header>, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_websocket_ack_format() {
        let json = serde_json::to_value(ProxyResponse::websocket_ack()).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "statusCode": 200,
                "headers": { "content-type": "text/plain; charset=utf-8" },
                "body": "OK",
                "isBase64Encoded": false
            })
        );
    }

    #[test]
    fn test_text_body() {
        let proxy = ProxyResponse::from_http(
            response(
                vec![Header::new("Content-Type", "text/plain; charset=utf-8")],
                b"Hello, world!",
            ),
            &[],
        );

        assert_eq!(proxy.status_code, 200);
        assert_eq!(proxy.body, "Hello, world!");
        assert!(!proxy.is_base64_encoded);
        assert_eq!(
            proxy.headers.get("content-type").map(String::as_str),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_binary_body_is_base64() {
        let proxy = ProxyResponse::from_http(
            response(vec![Header::new("content-type", "image/png")], &[0x89, 0x50]),
            &[],
        );

        assert!(proxy.is_base64_encoded);
        assert_eq!(proxy.body, "iVA=");
        assert_eq!(proxy.body_bytes().expect("decode"), vec![0x89, 0x50]);
    }

    #[test]
    fn test_compressed_text_is_base64() {
        let proxy = ProxyResponse::from_http(
            response(
                vec![
                    Header::new("content-type", "application/json"),
                    Header::new("content-encoding", "gzip"),
                ],
                b"{}",
            ),
            &[],
        );
        assert!(proxy.is_base64_encoded);
    }

    #[test]
    fn test_configured_text_mime_type() {
        let body = b"a,b\n1,2";
        let headers = vec![Header::new("content-type", "application/csv")];

        let default = ProxyResponse::from_http(response(headers.clone(), body), &[]);
        assert!(default.is_base64_encoded);

        let configured = ProxyResponse::from_http(
            response(headers, body),
            &["application/csv".to_string()],
        );
        assert!(!configured.is_base64_encoded);
        assert_eq!(configured.body, "a,b\n1,2");
    }

    #[test]
    fn test_structured_suffix_is_text() {
        assert!(is_text_mime("application/problem+json", &[]));
        assert!(is_text_mime("application/atom+xml; charset=utf-8", &[]));
        assert!(is_text_mime("TEXT/HTML", &[]));
        assert!(!is_text_mime("application/octet-stream", &[]));
    }

    #[test]
    fn test_empty_body_is_plain() {
        let proxy = ProxyResponse::from_http(response(Vec::new(), b""), &[]);
        assert_eq!(proxy.body, "");
        assert!(!proxy.is_base64_encoded);
    }

    #[test]
    fn test_duplicate_headers_are_joined() {
        let proxy = ProxyResponse::from_http(
            response(
                vec![
                    Header::new("Vary", "Accept"),
                    Header::new("vary", "Origin"),
                    Header::new("Set-Cookie", "a=1"),
                    Header::new("set-cookie", "b=2"),
                ],
                b"",
            ),
            &[],
        );

        assert_eq!(
            proxy.headers.get("vary").map(String::as_str),
            Some("Accept, Origin")
        );
        assert_eq!(
            proxy.headers.get("set-cookie").map(String::as_str),
            Some("b=2")
        );
        assert_eq!(
            proxy.multi_value_headers.get("set-cookie"),
            Some(&vec!["a=1".to_string(), "b=2".to_string()])
        );
    }

    #[test]
    fn test_multi_value_headers_omitted_when_empty() {
        let proxy = ProxyResponse::from_http(response(Vec::new(), b""), &[]);
        let json = serde_json::to_value(proxy).expect("serialize");
        assert!(json.get("multiValueHeaders").is_none());
    }
}
