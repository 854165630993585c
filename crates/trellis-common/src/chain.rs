//! Filter chain and transport middleware composition
//!
//! Two composition layers wrap every call:
//!
//! - **RPC filters** see the decoded envelope ([`IncomingRpc`] on the server,
//!   [`OutgoingRpc`] on the client). A filter receives the envelope and a
//!   [`Next`] handle; it may run code before and after `next.run(rpc)`, or
//!   return without calling it to short-circuit the call. The chain ends in
//!   a terminal [`RpcHandler`]: the application handler on the server and the
//!   HTTP send on the client.
//! - **Transport middleware** wraps the raw HTTP handler (server) or sender
//!   (client) and never sees decoded values.
//!
//! Both layers nest strictly: the first entry is the outermost one.
//!
//! The list for a method is always `common ++ method_specific`, resolved once
//! by [`build_table`] when a server or client is constructed.
//!
//! [`IncomingRpc`]: crate::rpc::IncomingRpc
//! [`OutgoingRpc`]: crate::rpc::OutgoingRpc

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::protocol::{BoxError, MethodSelector};

/// Outcome of one chain stage
pub type RpcResult = Result<(), BoxError>;

/// The stage that ends a chain.
pub trait RpcHandler<E>: Send + Sync {
    fn handle<'a>(&'a self, rpc: &'a mut E) -> BoxFuture<'a, RpcResult>;
}

/// An RPC-level interceptor.
pub trait RpcFilter<E>: Send + Sync {
    /// Identity reported in route metadata
    fn name(&self) -> &str;

    fn call<'a>(&'a self, rpc: &'a mut E, next: Next<'a, E>) -> BoxFuture<'a, RpcResult>;
}

pub type Filter<E> = Arc<dyn RpcFilter<E>>;

/// The remainder of a chain, consumed by running it.
///
/// Each `Next` can be run at most once, so every stage executes at most once
/// per call.
pub struct Next<'a, E> {
    filters: &'a [Filter<E>],
    terminal: &'a dyn RpcHandler<E>,
}

impl<'a, E: Send + 'static> Next<'a, E> {
    pub fn new(filters: &'a [Filter<E>], terminal: &'a dyn RpcHandler<E>) -> Self {
        Self { filters, terminal }
    }

    /// Runs the next filter, or the terminal handler once every filter ran.
    pub fn run<'b>(self, rpc: &'b mut E) -> BoxFuture<'b, RpcResult>
    where
        'a: 'b,
    {
        match self.filters.split_first() {
            Some((filter, rest)) => filter.call(
                rpc,
                Next {
                    filters: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.handle(rpc),
        }
    }

    /// Number of filters left before the terminal handler.
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }
}

struct FnFilter<F> {
    name: String,
    f: F,
}

impl<E, F> RpcFilter<E> for FnFilter<F>
where
    F: for<'a> Fn(&'a mut E, Next<'a, E>) -> BoxFuture<'a, RpcResult> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(&'a self, rpc: &'a mut E, next: Next<'a, E>) -> BoxFuture<'a, RpcResult> {
        (self.f)(rpc, next)
    }
}

/// Builds a named filter from a closure.
///
/// The closure returns a boxed future; `FutureExt::boxed` is the usual way to
/// build one:
///
/// ```
/// use futures::FutureExt;
/// use trellis_common::chain::{filter_fn, Filter};
/// use trellis_common::rpc::{Envelope, IncomingRpc};
///
/// let filter: Filter<IncomingRpc> = filter_fn("audit", |rpc: &mut IncomingRpc, next| {
///     async move {
///         let result = next.run(&mut *rpc).await;
///         tracing::info!(trace_id = rpc.trace_id(), "call finished");
///         result
///     }
///     .boxed()
/// });
/// assert_eq!(filter.name(), "audit");
/// ```
pub fn filter_fn<E, F>(name: impl Into<String>, f: F) -> Filter<E>
where
    E: 'static,
    F: for<'a> Fn(&'a mut E, Next<'a, E>) -> BoxFuture<'a, RpcResult> + Send + Sync + 'static,
{
    Arc::new(FnFilter {
        name: name.into(),
        f,
    })
}

struct FnHandler<F>(F);

impl<E, F> RpcHandler<E> for FnHandler<F>
where
    F: for<'a> Fn(&'a mut E) -> BoxFuture<'a, RpcResult> + Send + Sync,
{
    fn handle<'a>(&'a self, rpc: &'a mut E) -> BoxFuture<'a, RpcResult> {
        (self.0)(rpc)
    }
}

/// Builds a terminal handler from a closure.
pub fn handler_fn<E, F>(f: F) -> Arc<dyn RpcHandler<E>>
where
    E: 'static,
    F: for<'a> Fn(&'a mut E) -> BoxFuture<'a, RpcResult> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// A transport-level wrapper around a raw handler or sender.
pub trait Middleware<H>: Send + Sync {
    /// Identity reported in route metadata
    fn name(&self) -> &str;

    fn wrap(&self, next: H) -> H;
}

struct FnMiddleware<F> {
    name: String,
    f: F,
}

impl<H, F> Middleware<H> for FnMiddleware<F>
where
    F: Fn(H) -> H + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn wrap(&self, next: H) -> H {
        (self.f)(next)
    }
}

/// Builds a named middleware from a closure.
pub fn middleware_fn<H, F>(name: impl Into<String>, f: F) -> Arc<dyn Middleware<H>>
where
    H: 'static,
    F: Fn(H) -> H + Send + Sync + 'static,
{
    Arc::new(FnMiddleware {
        name: name.into(),
        f,
    })
}

/// Wraps `inner` so that `middlewares[0]` is the outermost layer.
pub fn compose<H>(middlewares: &[Arc<dyn Middleware<H>>], inner: H) -> H {
    middlewares
        .iter()
        .rev()
        .fold(inner, |handler, middleware| middleware.wrap(handler))
}

/// Resolves per-method lists: `entries[Any] ++ entries[Index(i)]` for every
/// method index `i` in `0..n_methods`.
pub fn build_table<T: Clone>(n_methods: usize, entries: &HashMap<MethodSelector, Vec<T>>) -> Vec<Vec<T>> {
    let common = entries
        .get(&MethodSelector::Any)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for selector in entries.keys() {
        if let MethodSelector::Index(index) = selector {
            if *index >= n_methods {
                tracing::warn!(index, n_methods, "ignoring options for unknown method index");
            }
        }
    }
    (0..n_methods)
        .map(|index| {
            let mut list = common.to_vec();
            if let Some(specific) = entries.get(&MethodSelector::Index(index)) {
                list.extend(specific.iter().cloned());
            }
            list
        })
        .collect()
}

impl<E> fmt::Debug for dyn RpcFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RpcFilter").field(&self.name()).finish()
    }
}

impl<H> fmt::Debug for dyn Middleware<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name()).finish()
    }
}
