//! Response envelope codec
//!
//! Every response body is one of
//!
//! ```text
//! {"traceID": "...", "results": {...}}
//! {"traceID": "...", "error": {"code": -32602, "message": "invalid params", "details": "..."}}
//! ```
//!
//! `results` is omitted for methods without output and `error` is omitted on
//! success.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RpcError;

#[derive(Debug, Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(rename = "traceID")]
    trace_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a RpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a Value>,
}

/// A decoded response body.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "traceID", default)]
    pub trace_id: String,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub results: Option<Value>,
}

/// Encodes a response body. `results` is ignored when `error` is set.
///
/// # Arguments
///
/// * `trace_id` - Trace ID of the call
/// * `error` - The error, if the call failed
/// * `results` - Encoded results, if the method has output
/// * `pretty` - Indent the output (debug mode)
pub fn encode_response(
    trace_id: &str,
    error: Option<&RpcError>,
    results: Option<&Value>,
    pretty: bool,
) -> serde_json::Result<Bytes> {
    let envelope = OutboundEnvelope {
        trace_id,
        error,
        results: if error.is_some() { None } else { results },
    };
    let body = if pretty {
        serde_json::to_vec_pretty(&envelope)?
    } else {
        serde_json::to_vec(&envelope)?
    };
    Ok(Bytes::from(body))
}

/// Body sent when the real response cannot be encoded: an internal error
/// under the call's trace ID, or with an empty trace ID if even that fails.
pub fn encode_internal_error(trace_id: &str) -> Bytes {
    const FALLBACK: &[u8] = br#"{"traceID":"","error":{"code":-32603,"message":"internal error"}}"#;
    encode_response(trace_id, Some(&RpcError::internal_error()), None, false)
        .unwrap_or_else(|_| Bytes::from_static(FALLBACK))
}

/// Decodes a response body.
pub fn decode_response(body: &[u8]) -> serde_json::Result<ResponseEnvelope> {
    serde_json::from_slice(body)
}
