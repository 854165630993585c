//! Default HTTP transport
//!
//! Sends requests through a `hyper_util` legacy client and collects the
//! whole response body before returning.

use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use trellis_common::protocol::{BoxError, TrellisError};
use trellis_common::transport::{http_sender, HttpRequest, HttpResponse, HttpSender};

/// Creates a sender backed by a pooled hyper client.
///
/// # Example
///
/// ```no_run
/// use trellis_client::hyper_transport;
///
/// let transport = hyper_transport();
/// ```
pub fn hyper_transport() -> HttpSender {
    let client = Client::builder(TokioExecutor::new()).build_http::<Full<bytes::Bytes>>();
    http_sender(move |req: HttpRequest| {
        let client = client.clone();
        async move {
            let response = client
                .request(req.map(Full::new))
                .await
                .map_err(|e| TrellisError::Transport(format!("HTTP request failed: {}", e)))?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| TrellisError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();
            Ok::<_, BoxError>(HttpResponse::from_parts(parts, body))
        }
    })
}
