//! HTTP Transport Types
//!
//! Raw request/response types shared by the server, the client and every
//! transport middleware.
//!
//! # Components
//!
//! - **[`HttpRequest`]** / **[`HttpResponse`]**: `http` messages with fully
//!   collected bodies
//! - **[`HttpHandler`]**: server side, turns a request into a response
//! - **[`HttpSender`]**: client side, sends a request and may fail before a
//!   response is obtained
//! - **[`IncomingContext`]** / **[`OutgoingContext`]**: request extensions
//!   that let middleware see which RPC a raw request belongs to
//!
//! # Example
//!
//! ```
//! use trellis_common::transport::{http_handler, json_response, HttpRequest};
//!
//! let echo = http_handler(|req: HttpRequest| async move {
//!     json_response(req.into_body())
//! });
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request, Response, StatusCode};

use crate::protocol::{BoxError, MethodInfo};

/// Request with a fully collected body
pub type HttpRequest = Request<Bytes>;

/// Response with a fully collected body
pub type HttpResponse = Response<Bytes>;

/// Server-side raw handler; errors are already encoded in the response.
pub type HttpHandler = Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

/// Client-side raw transport; an error means no response was obtained.
pub type HttpSender =
    Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpResponse, BoxError>> + Send + Sync>;

/// Content type of every request and response body
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Wraps an async closure as an [`HttpHandler`].
pub fn http_handler<F, Fut>(f: F) -> HttpHandler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

/// Wraps an async closure as an [`HttpSender`].
pub fn http_sender<F, Fut>(f: F) -> HttpSender
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, BoxError>> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

/// Builds a 200 response carrying a JSON body.
pub fn json_response(body: Bytes) -> HttpResponse {
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

/// Builds an empty response with the given status.
pub fn status_response(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

/// Returns a header value as a string, if present and valid UTF-8.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Request extension inserted by the server before transport middleware runs.
#[derive(Debug, Clone)]
pub struct IncomingContext {
    pub method: &'static MethodInfo,
    pub trace_id: String,
    /// `true` if the trace ID came from the caller rather than the generator
    pub trace_id_is_received: bool,
}

/// Request extension inserted by the client before transport middleware runs.
#[derive(Debug, Clone)]
pub struct OutgoingContext {
    pub method: &'static MethodInfo,
    pub trace_id: String,
}

/// Request extension carrying the peer address of the connection.
#[derive(Debug, Clone, Copy)]
pub struct RemoteAddr(pub SocketAddr);

/// Request extension shared between the HTTP server and the call it runs.
///
/// The server marks it closed when the connection goes away before the
/// response could be handed back for writing. The call itself keeps running.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState(Arc<AtomicBool>);

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_closed(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
