//! Outbound call logging filter

use futures::future::BoxFuture;
use futures::FutureExt;
use trellis_common::chain::{Next, RpcFilter, RpcResult};
use trellis_common::rpc::{loggable_body, Envelope, OutgoingRpc};

/// Raw bodies longer than this are truncated unless debug mode is on.
pub const DEFAULT_MAX_BODY_LOG_SIZE: usize = 500;

/// Logs every outgoing call after it completes.
///
/// Calls that never got a response (transport failures, timeouts inside the
/// filter) are logged at `ERROR`, everything else at `INFO`.
#[derive(Debug, Clone)]
pub struct OutgoingRpcLogger {
    pub max_raw_params_size: usize,
    pub max_raw_resp_size: usize,
}

impl Default for OutgoingRpcLogger {
    fn default() -> Self {
        Self {
            max_raw_params_size: DEFAULT_MAX_BODY_LOG_SIZE,
            max_raw_resp_size: DEFAULT_MAX_BODY_LOG_SIZE,
        }
    }
}

impl OutgoingRpcLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RpcFilter<OutgoingRpc> for OutgoingRpcLogger {
    fn name(&self) -> &str {
        "OutgoingRpcLogger"
    }

    fn call<'a>(&'a self, rpc: &'a mut OutgoingRpc, next: Next<'a, OutgoingRpc>) -> BoxFuture<'a, RpcResult> {
        async move {
            let result = next.run(&mut *rpc).await;

            let params = loggable_body(rpc.raw_params(), self.max_raw_params_size);
            let resp = loggable_body(rpc.raw_resp(), self.max_raw_resp_size);
            let error_code = rpc.error().map(|error| error.code).unwrap_or_default();
            match (&result, rpc.status_code()) {
                (Err(err), None) => tracing::error!(
                    trace_id = rpc.trace_id(),
                    full_method_name = rpc.full_method_name(),
                    url = rpc.url(),
                    params = %params,
                    error = %err,
                    "outgoing rpc"
                ),
                (_, status_code) => tracing::info!(
                    trace_id = rpc.trace_id(),
                    full_method_name = rpc.full_method_name(),
                    url = rpc.url(),
                    status_code = status_code.unwrap_or_default(),
                    error_code,
                    params = %params,
                    resp = %resp,
                    "outgoing rpc"
                ),
            }
            result
        }
        .boxed()
    }
}
