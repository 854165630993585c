//! Client options

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use trellis_common::chain::{Filter, Middleware};
use trellis_common::protocol::MethodSelector;
use trellis_common::rpc::OutgoingRpc;
use trellis_common::transport::HttpSender;

/// Transport middleware wrapping the raw client sender.
pub type ClientMiddleware = Arc<dyn Middleware<HttpSender>>;

/// Per-service client options.
///
/// `Any` entries apply to every method and run before the method-specific
/// ones. Without an explicit `transport`, calls go through a hyper client.
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub middlewares: HashMap<MethodSelector, Vec<ClientMiddleware>>,
    pub rpc_filters: HashMap<MethodSelector, Vec<Filter<OutgoingRpc>>>,
    /// Upper bound for a whole call, filters included
    pub timeout: Option<Duration>,
    pub transport: Option<HttpSender>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_common_middlewares(&mut self, middlewares: impl IntoIterator<Item = ClientMiddleware>) -> &mut Self {
        self.add_middlewares(MethodSelector::Any, middlewares)
    }

    pub fn add_middlewares(
        &mut self,
        selector: impl Into<MethodSelector>,
        middlewares: impl IntoIterator<Item = ClientMiddleware>,
    ) -> &mut Self {
        self.middlewares
            .entry(selector.into())
            .or_default()
            .extend(middlewares);
        self
    }

    pub fn add_common_rpc_filters(
        &mut self,
        filters: impl IntoIterator<Item = Filter<OutgoingRpc>>,
    ) -> &mut Self {
        self.add_rpc_filters(MethodSelector::Any, filters)
    }

    pub fn add_rpc_filters(
        &mut self,
        selector: impl Into<MethodSelector>,
        filters: impl IntoIterator<Item = Filter<OutgoingRpc>>,
    ) -> &mut Self {
        self.rpc_filters
            .entry(selector.into())
            .or_default()
            .extend(filters);
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set_transport(&mut self, transport: HttpSender) -> &mut Self {
        self.transport = Some(transport);
        self
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("middlewares", &self.middlewares)
            .field("rpc_filters", &self.rpc_filters)
            .field("timeout", &self.timeout)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}
