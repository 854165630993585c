//! Trace ID generation and ambient propagation
//!
//! The server assigns every inbound call a trace ID, taken from the
//! [`TRACE_ID_HEADER`] request header when present and generated otherwise.
//! The ID is then scoped as a tokio task-local around everything that runs
//! for the call, so any outbound call issued from inside the handler picks it
//! up without it being passed explicitly.
//!
//! The scope does not cross `tokio::spawn`; work moved to another task must
//! be wrapped in [`with_trace_id`] again.

use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::{HeaderMap, HeaderValue};

/// Header carrying the trace ID in both directions
pub const TRACE_ID_HEADER: &str = "x-trellis-trace-id";

/// Produces a fresh trace ID for calls that arrive without one.
pub type TraceIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

tokio::task_local! {
    static TRACE_ID: String;
}

/// 16 random bytes, base64url-encoded without padding.
pub fn generate_trace_id() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 16]>())
}

pub fn default_trace_id_generator() -> TraceIdGenerator {
    Arc::new(generate_trace_id)
}

/// Trace ID of the inbound call being handled by the current task, if any.
pub fn current_trace_id() -> Option<String> {
    TRACE_ID.try_with(|trace_id| trace_id.clone()).ok()
}

/// Runs `future` with `trace_id` as the ambient trace ID.
///
/// # Example
///
/// ```
/// use trellis_common::trace::{current_trace_id, with_trace_id};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// assert_eq!(current_trace_id(), None);
/// let seen = with_trace_id("abc".to_string(), async { current_trace_id() }).await;
/// assert_eq!(seen.as_deref(), Some("abc"));
/// # }
/// ```
pub async fn with_trace_id<F>(trace_id: String, future: F) -> F::Output
where
    F: Future,
{
    TRACE_ID.scope(trace_id, future).await
}

/// Reads a non-empty trace ID from `headers`.
pub fn get_trace_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Sets the trace ID header. IDs that are not valid header values are skipped.
pub fn set_trace_id(headers: &mut HeaderMap, trace_id: &str) {
    match HeaderValue::from_str(trace_id) {
        Ok(value) => {
            headers.insert(TRACE_ID_HEADER, value);
        }
        Err(_) => {
            tracing::warn!(trace_id, "trace ID is not a valid header value");
        }
    }
}
