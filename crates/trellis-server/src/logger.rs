//! Request logging filter
//!
//! [`IncomingRpcLogger`] is an ordinary RPC filter: it runs the rest of the
//! chain and then emits one `tracing` event per call. Calls failing with an
//! internal error are logged at `ERROR`, everything else at `INFO`.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use trellis_common::chain::{Next, RpcFilter, RpcResult};
use trellis_common::protocol::find_rpc_error;
use trellis_common::rpc::{loggable_body, Envelope, IncomingRpc};

/// Raw bodies longer than this are truncated unless debug mode is on.
pub const DEFAULT_MAX_BODY_LOG_SIZE: usize = 500;

/// Logs every incoming call after it completes.
#[derive(Debug, Clone)]
pub struct IncomingRpcLogger {
    pub max_params_size: usize,
    pub max_results_size: usize,
}

impl Default for IncomingRpcLogger {
    fn default() -> Self {
        Self {
            max_params_size: DEFAULT_MAX_BODY_LOG_SIZE,
            max_results_size: DEFAULT_MAX_BODY_LOG_SIZE,
        }
    }
}

impl IncomingRpcLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, rpc: &IncomingRpc, result: &RpcResult) {
        let params = loggable_body(rpc.raw_params(), self.max_params_size);
        let results = rpc
            .results()
            .and_then(|results| results.encode().ok())
            .map(Bytes::from);
        let results = loggable_body(results.as_ref(), self.max_results_size);
        let remote_ip = rpc.remote_ip().map(|ip| ip.to_string()).unwrap_or_default();

        match result {
            Ok(()) => tracing::info!(
                trace_id = rpc.trace_id(),
                full_method_name = rpc.full_method_name(),
                remote_ip = %remote_ip,
                params = %params,
                results = %results,
                "incoming rpc"
            ),
            Err(err) => match find_rpc_error(&**err) {
                Some(rpc_error) => tracing::info!(
                    trace_id = rpc.trace_id(),
                    full_method_name = rpc.full_method_name(),
                    remote_ip = %remote_ip,
                    params = %params,
                    error_code = rpc_error.code,
                    error = %err,
                    "incoming rpc"
                ),
                None => tracing::error!(
                    trace_id = rpc.trace_id(),
                    full_method_name = rpc.full_method_name(),
                    remote_ip = %remote_ip,
                    params = %params,
                    error = %err,
                    "incoming rpc"
                ),
            },
        }
    }
}

impl RpcFilter<IncomingRpc> for IncomingRpcLogger {
    fn name(&self) -> &str {
        "IncomingRpcLogger"
    }

    fn call<'a>(&'a self, rpc: &'a mut IncomingRpc, next: Next<'a, IncomingRpc>) -> BoxFuture<'a, RpcResult> {
        async move {
            let result = next.run(&mut *rpc).await;
            self.log(rpc, &result);
            result
        }
        .boxed()
    }
}
