//! HTTP Server for trellis services
//!
//! This module provides the HTTP server that exposes a [`Router`] over
//! HTTP/1.1 using hyper.
//!
//! # Architecture
//!
//! The HTTP server:
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Collects each request body, up to the configured size limit
//! - Records the peer address as a [`RemoteAddr`] request extension
//! - Runs each request on its own task, so a dropped connection discards
//!   the response without cancelling the call
//! - Hands the request to the router and writes back its response
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis_server::{HttpServer, Router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new();
//!     // register services on the router here
//!     let server = HttpServer::new(Arc::new(router));
//!     server.run("127.0.0.1:8080".parse().unwrap()).await.unwrap();
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use trellis_common::protocol::{Result, TrellisError};
use trellis_common::transport::{ConnectionState, RemoteAddr};

use crate::options::ServerConfig;
use crate::router::Router;

/// HTTP server for a trellis router.
pub struct HttpServer {
    /// The router dispatching requests to registered methods
    router: Arc<Router>,
    config: ServerConfig,
}

impl HttpServer {
    /// Creates a new HTTP server with the default configuration.
    ///
    /// # Arguments
    ///
    /// * `router` - The router with every service already registered
    ///
    /// # Returns
    ///
    /// A new `HttpServer` instance
    pub fn new(router: Arc<Router>) -> Self {
        Self::with_config(router, ServerConfig::default())
    }

    /// Creates a new HTTP server with an explicit configuration.
    pub fn with_config(router: Arc<Router>, config: ServerConfig) -> Self {
        Self { router, config }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Runs the HTTP server on the specified address.
    ///
    /// # Arguments
    ///
    /// * `addr` - The socket address to bind to
    ///
    /// # Returns
    ///
    /// Only returns on failure: binding, or accepting a connection
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TrellisError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves connections accepted from an already bound listener.
    ///
    /// Useful when binding to port 0 and reading the assigned address first.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        tracing::info!(
            "HTTP server listening on {}",
            listener
                .local_addr()
                .map_err(|e| TrellisError::Transport(format!("Failed to get local address: {}", e)))?
        );

        loop {
            let (stream, remote_addr) = listener
                .accept()
                .await
                .map_err(|e| TrellisError::Transport(format!("Failed to accept connection: {}", e)))?;

            let io = TokioIo::new(stream);
            let router = self.router.clone();
            let max_body_size = self.config.max_body_size;

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let router = router.clone();
                    async move {
                        let connection = ConnectionState::new();
                        let guard = ClosedOnDrop(Some(connection.clone()));
                        let call = tokio::spawn(Self::handle_request(router, req, remote_addr, max_body_size, connection));
                        let response = match call.await {
                            Ok(response) => response,
                            Err(err) => {
                                tracing::error!(%remote_addr, "Request task failed: {}", err);
                                empty_response(StatusCode::INTERNAL_SERVER_ERROR)
                            }
                        };
                        guard.disarm();
                        Ok::<_, Infallible>(response)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {}", err);
                }
            });
        }
    }

    /// Handles an HTTP request.
    ///
    /// Bodies over `max_body_size` are rejected with HTTP 413 before the
    /// router sees them.
    async fn handle_request(
        router: Arc<Router>,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
        max_body_size: usize,
        connection: ConnectionState,
    ) -> Response<Full<Bytes>> {
        let (mut parts, body) = req.into_parts();

        let body = match Limited::new(body, max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(%remote_addr, max_body_size, "Request body too large");
                return empty_response(StatusCode::PAYLOAD_TOO_LARGE);
            }
            Err(err) => {
                tracing::warn!(%remote_addr, "Failed to read request body: {}", err);
                return empty_response(StatusCode::BAD_REQUEST);
            }
        };

        parts.extensions.insert(RemoteAddr(remote_addr));
        parts.extensions.insert(connection);
        router
            .handle(Request::from_parts(parts, body))
            .await
            .map(Full::new)
    }
}

/// Marks the connection closed if hyper drops the request before the
/// response is ready.
struct ClosedOnDrop(Option<ConnectionState>);

impl ClosedOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ClosedOnDrop {
    fn drop(&mut self) {
        if let Some(connection) = self.0.take() {
            connection.mark_closed();
        }
    }
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
