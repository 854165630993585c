//! HTTP Router for trellis services
//!
//! The router maps `/rpc/{fullMethodName}` paths to the handlers built by
//! [`ServiceRegistrar`](crate::ServiceRegistrar). Matching is exact and only
//! `POST` requests are routed; everything else goes to the not-found handler,
//! which answers HTTP 404 with an empty body unless replaced.
//!
//! Besides the handlers, the router keeps a [`RouteInfo`] per route so the
//! attached middleware and filters can be inspected after registration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_server::Router;
//!
//! let router = Arc::new(Router::new());
//! assert!(router.route_infos().is_empty());
//! let transport = router.in_memory_transport();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::{Method, StatusCode};
use trellis_common::protocol::{BoxError, Result, TrellisError};
use trellis_common::transport::{http_handler, http_sender, status_response, HttpHandler, HttpRequest, HttpResponse, HttpSender};

/// Metadata recorded for every registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP path, e.g. `/rpc/Foo.Test.DoSomething`
    pub rpc_path: String,
    pub full_method_name: &'static str,
    /// Names of the transport middleware, outermost first
    pub server_middlewares: Vec<String>,
    /// Names of the RPC filters, outermost first
    pub rpc_filters: Vec<String>,
}

/// Path-based dispatcher for registered RPC methods.
///
/// Routes are added while services are registered; afterwards the router is
/// shared behind an `Arc` and only read.
pub struct Router {
    routes: HashMap<String, HttpHandler>,
    route_infos: Vec<RouteInfo>,
    not_found: HttpHandler,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            route_infos: Vec::new(),
            not_found: http_handler(|_req: HttpRequest| async { status_response(StatusCode::NOT_FOUND) }),
        }
    }

    /// Binds `handler` to `info.rpc_path`.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::DuplicateRoute`] if the path is already taken.
    pub fn add_route(&mut self, info: RouteInfo, handler: HttpHandler) -> Result<()> {
        if self.routes.contains_key(&info.rpc_path) {
            return Err(TrellisError::DuplicateRoute(info.rpc_path));
        }
        tracing::debug!(path = %info.rpc_path, "registered route");
        self.routes.insert(info.rpc_path.clone(), handler);
        self.route_infos.push(info);
        Ok(())
    }

    /// Route metadata in registration order.
    pub fn route_infos(&self) -> &[RouteInfo] {
        &self.route_infos
    }

    /// Replaces the handler for unmatched requests.
    pub fn set_not_found_handler(&mut self, handler: HttpHandler) {
        self.not_found = handler;
    }

    /// Dispatches one request.
    ///
    /// The returned future owns everything it needs, so it can be spawned.
    pub fn handle(&self, req: HttpRequest) -> BoxFuture<'static, HttpResponse> {
        let handler = if req.method() == Method::POST {
            self.routes.get(req.uri().path())
        } else {
            None
        };
        match handler {
            Some(handler) => handler(req),
            None => (self.not_found)(req),
        }
    }

    /// Returns a client transport that dispatches straight into this router.
    ///
    /// Each request is handled on its own tokio task, as a connection would
    /// be, so ambient state of the caller never leaks into the server side.
    pub fn in_memory_transport(self: &Arc<Self>) -> HttpSender {
        let router = Arc::clone(self);
        http_sender(move |req: HttpRequest| {
            let response = router.handle(req);
            async move {
                tokio::spawn(response).await.map_err(|e| -> BoxError {
                    Box::new(TrellisError::Transport(format!("In-memory call failed: {}", e)))
                })
            }
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("route_infos", &self.route_infos)
            .finish_non_exhaustive()
    }
}
