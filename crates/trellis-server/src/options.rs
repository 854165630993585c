//! Server options
//!
//! [`ServerOptions`] collects the transport middleware, RPC filters and trace
//! ID generator a service is registered with. Entries are keyed by
//! [`MethodSelector`]: `Any` entries apply to every method of the service and
//! run before the method-specific ones.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_common::chain::{Filter, Middleware};
use trellis_common::protocol::MethodSelector;
use trellis_common::rpc::IncomingRpc;
use trellis_common::trace::TraceIdGenerator;
use trellis_common::transport::HttpHandler;

/// Transport middleware wrapping the raw server handler.
pub type ServerMiddleware = Arc<dyn Middleware<HttpHandler>>;

/// Default request body limit (4 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Per-service registration options.
///
/// # Example
///
/// ```
/// use trellis_common::protocol::ANY_METHOD;
/// use trellis_common::rpc::incoming_filter;
/// use trellis_server::ServerOptions;
///
/// let mut options = ServerOptions::default();
/// options.add_rpc_filters(
///     ANY_METHOD,
///     [incoming_filter("noop", |rpc, next| next.run(rpc))],
/// );
/// ```
#[derive(Clone, Default)]
pub struct ServerOptions {
    pub middlewares: HashMap<MethodSelector, Vec<ServerMiddleware>>,
    pub rpc_filters: HashMap<MethodSelector, Vec<Filter<IncomingRpc>>>,
    /// Generator for calls that arrive without a trace ID; random IDs when unset
    pub trace_id_generator: Option<TraceIdGenerator>,
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends middleware applied to every method.
    pub fn add_common_middlewares(&mut self, middlewares: impl IntoIterator<Item = ServerMiddleware>) -> &mut Self {
        self.add_middlewares(MethodSelector::Any, middlewares)
    }

    /// Appends middleware for the selected method(s).
    pub fn add_middlewares(
        &mut self,
        selector: impl Into<MethodSelector>,
        middlewares: impl IntoIterator<Item = ServerMiddleware>,
    ) -> &mut Self {
        self.middlewares
            .entry(selector.into())
            .or_default()
            .extend(middlewares);
        self
    }

    /// Appends RPC filters applied to every method.
    pub fn add_common_rpc_filters(
        &mut self,
        filters: impl IntoIterator<Item = Filter<IncomingRpc>>,
    ) -> &mut Self {
        self.add_rpc_filters(MethodSelector::Any, filters)
    }

    /// Appends RPC filters for the selected method(s).
    pub fn add_rpc_filters(
        &mut self,
        selector: impl Into<MethodSelector>,
        filters: impl IntoIterator<Item = Filter<IncomingRpc>>,
    ) -> &mut Self {
        self.rpc_filters
            .entry(selector.into())
            .or_default()
            .extend(filters);
        self
    }

    pub fn set_trace_id_generator(&mut self, generator: TraceIdGenerator) -> &mut Self {
        self.trace_id_generator = Some(generator);
        self
    }
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("middlewares", &self.middlewares)
            .field("rpc_filters", &self.rpc_filters)
            .field("trace_id_generator", &self.trace_id_generator.is_some())
            .finish()
    }
}

/// Configuration of the HTTP accept loop.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest accepted request body; larger bodies get HTTP 413
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}
