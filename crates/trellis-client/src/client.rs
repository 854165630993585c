use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use http::header::CONTENT_TYPE;
use http::{Method, Request};
use trellis_common::chain::{build_table, compose, Filter, Next, RpcHandler, RpcResult};
use trellis_common::model::Model;
use trellis_common::protocol::{BoxError, MethodInfo, Result, TrellisError};
use trellis_common::rpc::{Envelope, OutgoingRpc};
use trellis_common::trace::set_trace_id;
use trellis_common::transport::{HttpSender, OutgoingContext, JSON_CONTENT_TYPE};
use trellis_common::validation::{Validate, ValidationContext};

use crate::options::ClientOptions;
use crate::transport::hyper_transport;

/// Client core shared by the generated stubs of one service.
///
/// Per-method filter lists and senders (transport wrapped in the method's
/// middleware) are resolved once in [`Client::new`].
pub struct Client {
    base_url: String,
    rpc_filters: Vec<Vec<Filter<OutgoingRpc>>>,
    senders: Vec<HttpSender>,
    timeout: Option<Duration>,
}

impl Client {
    /// Create a client for a service with `n_methods` methods served at `base_url`
    pub fn new(base_url: impl Into<String>, n_methods: usize, options: ClientOptions) -> Self {
        let transport = options.transport.clone().unwrap_or_else(hyper_transport);
        let senders = build_table(n_methods, &options.middlewares)
            .iter()
            .map(|middlewares| compose(middlewares, transport.clone()))
            .collect();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            rpc_filters: build_table(n_methods, &options.rpc_filters),
            senders,
            timeout: options.timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call an RPC method
    ///
    /// Runs the method's filters around the HTTP send, then validates the
    /// decoded results. Every failure is wrapped in [`TrellisError::Call`];
    /// an error returned by the server is its source and can be matched with
    /// [`TrellisError::rpc_error`] or `error_is`.
    pub async fn call<P: Model, R: Model>(&self, method: &'static MethodInfo, params: P) -> Result<R> {
        let (Some(filters), Some(sender)) = (self.rpc_filters.get(method.index), self.senders.get(method.index)) else {
            return Err(TrellisError::UnknownMethod(method.full_method_name));
        };
        let url = format!("{}{}", self.base_url, method.rpc_path());
        let mut rpc = OutgoingRpc::new::<P, R>(method, url, params).with_sender(sender.clone());

        let run = Next::new(filters, &SendHttp).run(&mut rpc);
        let outcome = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, run).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Box::new(TrellisError::Timeout(timeout.as_millis() as u64)) as BoxError),
            },
            None => run.await,
        };

        let failed = |rpc: &OutgoingRpc, source: BoxError| TrellisError::Call {
            full_method_name: method.full_method_name,
            trace_id: rpc.trace_id().to_owned(),
            source,
        };
        if let Err(err) = outcome {
            return Err(failed(&rpc, err));
        }
        if R::IS_EMPTY {
            return Ok(R::default());
        }

        let results = rpc
            .take_results()
            .and_then(|results| results.take::<R>())
            .unwrap_or_default();
        let mut vc = ValidationContext::new();
        if !results.validate(&mut vc) {
            let details = vc.error_details().to_owned();
            return Err(failed(&rpc, Box::new(TrellisError::InvalidResults(details))));
        }
        Ok(results)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("rpc_filters", &self.rpc_filters)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Terminal stage of every client chain: the HTTP round trip.
struct SendHttp;

impl RpcHandler<OutgoingRpc> for SendHttp {
    fn handle<'a>(&'a self, rpc: &'a mut OutgoingRpc) -> BoxFuture<'a, RpcResult> {
        async move {
            let sender = rpc
                .sender()
                .cloned()
                .ok_or_else(|| TrellisError::Transport("No transport configured".to_string()))?;
            let body = rpc.encode_params()?;

            let mut req = Request::builder()
                .method(Method::POST)
                .uri(rpc.url())
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body)
                .map_err(|e| TrellisError::Transport(format!("Failed to build request: {}", e)))?;
            if !rpc.trace_id().is_empty() {
                set_trace_id(req.headers_mut(), rpc.trace_id());
            }
            req.extensions_mut().insert(OutgoingContext {
                method: rpc.method(),
                trace_id: rpc.trace_id().to_owned(),
            });

            let response = sender(req).await?;
            let (parts, body) = response.into_parts();
            rpc.read_response(parts.status.as_u16(), body)
        }
        .boxed()
    }
}
