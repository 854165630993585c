//! Service registration
//!
//! A generated `register_*_service` function creates one [`ServiceRegistrar`]
//! and calls [`ServiceRegistrar::register`] once per method. Registration
//! builds the handler served for the method's path, from the inside out:
//!
//! 1. the **dispatch** stage, calling the application handler with the
//!    decoded params and recovering from panics;
//! 2. the method's **RPC filters**, run in order around the dispatch stage;
//! 3. the **incoming processor**, which builds the [`IncomingRpc`], decodes
//!    and validates the params, runs the chain and encodes the response;
//! 4. the method's **transport middleware**, first entry outermost;
//! 5. the **trace layer**, which assigns the trace ID and scopes it around
//!    everything above.
//!
//! The filter and middleware lists are resolved once, when the registrar is
//! created, and never change afterwards.

use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use trellis_common::chain::{build_table, compose, Filter, Next, RpcHandler, RpcResult};
use trellis_common::model::{Model, Payload};
use trellis_common::protocol::{BoxError, MethodInfo, PanicError, Result, TrellisError};
use trellis_common::rpc::{Envelope, IncomingRpc};
use trellis_common::trace::{default_trace_id_generator, get_trace_id, set_trace_id, with_trace_id, TraceIdGenerator};
use trellis_common::transport::{
    header_str, json_response, ConnectionState, HttpHandler, HttpRequest, HttpResponse, IncomingContext, RemoteAddr,
};

use crate::options::{ServerMiddleware, ServerOptions};
use crate::router::{RouteInfo, Router};

/// Outcome of an application handler
pub type HandlerResult<R> = std::result::Result<R, BoxError>;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Registers the methods of one service on a [`Router`].
pub struct ServiceRegistrar<'r> {
    router: &'r mut Router,
    rpc_filters: Vec<Vec<Filter<IncomingRpc>>>,
    middlewares: Vec<Vec<ServerMiddleware>>,
    trace_id_generator: TraceIdGenerator,
}

impl<'r> ServiceRegistrar<'r> {
    /// Creates a registrar for a service with `n_methods` methods.
    ///
    /// # Arguments
    ///
    /// * `router` - The router the methods are added to
    /// * `n_methods` - Number of methods of the service; method indexes must
    ///   be below it
    /// * `options` - Middleware, filters and trace ID generator
    pub fn new(router: &'r mut Router, n_methods: usize, options: &ServerOptions) -> Self {
        Self {
            router,
            rpc_filters: build_table(n_methods, &options.rpc_filters),
            middlewares: build_table(n_methods, &options.middlewares),
            trace_id_generator: options
                .trace_id_generator
                .clone()
                .unwrap_or_else(default_trace_id_generator),
        }
    }

    /// Serves `method` with `handler`.
    ///
    /// `P` and `R` are the method's params and results types; `()` stands for
    /// none. The handler runs with the call's trace ID as the ambient trace
    /// ID, so outbound calls it makes continue the same trace.
    ///
    /// # Errors
    ///
    /// * [`TrellisError::UnknownMethod`] if the method index is out of range
    /// * [`TrellisError::DuplicateRoute`] if the method is already registered
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_common::protocol::MethodInfo;
    /// use trellis_server::{Router, ServerOptions, ServiceRegistrar};
    ///
    /// static PING: MethodInfo = MethodInfo::new("Foo", "Health", "Ping", "Foo.Health.Ping", 0);
    ///
    /// let mut router = Router::new();
    /// let mut registrar = ServiceRegistrar::new(&mut router, 1, &ServerOptions::default());
    /// registrar.register::<(), (), _, _>(&PING, |()| async { Ok(()) }).unwrap();
    /// assert_eq!(router.route_infos()[0].rpc_path, "/rpc/Foo.Health.Ping");
    /// ```
    pub fn register<P, R, F, Fut>(&mut self, method: &'static MethodInfo, handler: F) -> Result<()>
    where
        P: Model,
        R: Model,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    {
        let index = method.index;
        let (Some(filters), Some(middlewares)) = (self.rpc_filters.get(index), self.middlewares.get(index)) else {
            return Err(TrellisError::UnknownMethod(method.full_method_name));
        };

        let dispatch: Arc<dyn RpcHandler<IncomingRpc>> = Arc::new(Dispatch::<P, R, F, Fut> {
            handler,
            _types: PhantomData,
        });
        let processor = incoming_processor::<P>(method, filters.clone().into(), dispatch);
        let handler = trace_layer(method, self.trace_id_generator.clone(), compose(middlewares, processor));

        let info = RouteInfo {
            rpc_path: method.rpc_path(),
            full_method_name: method.full_method_name,
            server_middlewares: middlewares.iter().map(|m| m.name().to_owned()).collect(),
            rpc_filters: filters.iter().map(|f| f.name().to_owned()).collect(),
        };
        self.router.add_route(info, handler)
    }
}

/// Terminal stage: hands the decoded params to the application handler.
struct Dispatch<P, R, F, Fut> {
    handler: F,
    _types: PhantomData<fn(P) -> (R, Fut)>,
}

impl<P, R, F, Fut> RpcHandler<IncomingRpc> for Dispatch<P, R, F, Fut>
where
    P: Model,
    R: Model,
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<R>> + Send,
{
    fn handle<'a>(&'a self, rpc: &'a mut IncomingRpc) -> BoxFuture<'a, RpcResult> {
        async move {
            let params = rpc
                .params()
                .and_then(|params| params.get::<P>())
                .cloned()
                .unwrap_or_default();
            // Panics stop here, before unwinding through filters or middleware.
            let results = AssertUnwindSafe(async { (self.handler)(params).await })
                .catch_unwind()
                .await
                .map_err(|payload| -> BoxError { Box::new(PanicError::from_payload(payload)) })??;
            if !R::IS_EMPTY {
                rpc.set_results(Payload::new(results));
            }
            Ok(())
        }
        .boxed()
    }
}

fn incoming_processor<P: Model>(
    method: &'static MethodInfo,
    filters: Arc<[Filter<IncomingRpc>]>,
    dispatch: Arc<dyn RpcHandler<IncomingRpc>>,
) -> HttpHandler {
    Arc::new(move |req: HttpRequest| process_incoming::<P>(method, filters.clone(), dispatch.clone(), req).boxed())
}

/// Runs one call from the raw request to the encoded response.
async fn process_incoming<P: Model>(
    method: &'static MethodInfo,
    filters: Arc<[Filter<IncomingRpc>]>,
    dispatch: Arc<dyn RpcHandler<IncomingRpc>>,
    req: HttpRequest,
) -> HttpResponse {
    let (parts, body) = req.into_parts();
    let (trace_id, trace_id_is_received) = match parts.extensions.get::<IncomingContext>() {
        Some(context) => (context.trace_id.clone(), context.trace_id_is_received),
        None => (String::new(), false),
    };
    let connection = parts.extensions.get::<ConnectionState>().cloned();
    let mut rpc = IncomingRpc::new(method, trace_id, trace_id_is_received, body);
    rpc.set_remote(
        parts.extensions.get::<RemoteAddr>().map(|remote| remote.0),
        header_str(&parts.headers, X_FORWARDED_FOR).map(str::to_owned),
    );

    let outcome = AssertUnwindSafe(async {
        if !rpc.decode_params::<P>() {
            log_rejected(&rpc);
            return Ok(());
        }
        Next::new(&filters, dispatch.as_ref()).run(&mut rpc).await
    })
    .catch_unwind()
    .await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => rpc.save_error(err),
        Err(payload) => rpc.save_error(Box::new(PanicError::from_payload(payload))),
    }

    if let Some(err) = rpc.internal_error() {
        tracing::error!(
            trace_id = rpc.trace_id(),
            full_method_name = method.full_method_name,
            stack_trace = rpc.stack_trace().unwrap_or_default(),
            "Internal error: {}",
            err
        );
    }
    let body = rpc.encode_response();
    if let Some(err) = rpc.encode_resp_error() {
        tracing::error!(
            trace_id = rpc.trace_id(),
            full_method_name = method.full_method_name,
            "Failed to encode response: {}",
            err
        );
    }
    if let Some(connection) = &connection {
        if !rpc.check_connection(connection) {
            tracing::warn!(
                trace_id = rpc.trace_id(),
                full_method_name = method.full_method_name,
                "Response dropped: {}",
                rpc.write_resp_error().map(ToString::to_string).unwrap_or_default()
            );
        }
    }
    json_response(body)
}

/// Logs a call rejected before the filter chain, which never sees it.
fn log_rejected(rpc: &IncomingRpc) {
    let Some(error) = rpc.error() else {
        return;
    };
    tracing::info!(
        trace_id = rpc.trace_id(),
        full_method_name = rpc.full_method_name(),
        remote_ip = %rpc.remote_ip().map(|ip| ip.to_string()).unwrap_or_default(),
        error_code = error.code,
        error = %error.details,
        "incoming rpc rejected"
    );
}

/// Outermost layer: assigns the trace ID and scopes it around the call.
///
/// A trace ID received in the request header is kept; otherwise one is
/// generated and echoed in the response header.
fn trace_layer(method: &'static MethodInfo, generator: TraceIdGenerator, inner: HttpHandler) -> HttpHandler {
    Arc::new(move |mut req: HttpRequest| {
        let (trace_id, received) = match get_trace_id(req.headers()) {
            Some(trace_id) => (trace_id, true),
            None => (generator(), false),
        };
        req.extensions_mut().insert(IncomingContext {
            method,
            trace_id: trace_id.clone(),
            trace_id_is_received: received,
        });
        let inner = inner.clone();
        async move {
            let mut response = with_trace_id(trace_id.clone(), async move { inner(req).await }).await;
            if !received {
                set_trace_id(response.headers_mut(), &trace_id);
            }
            response
        }
        .boxed()
    })
}
