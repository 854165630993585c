use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use futures::future::BoxFuture;
use serde_json::error::Category;

use super::{Envelope, Rpc};
use crate::chain::{filter_fn, Filter, Next, RpcResult};
use crate::debug::debug_mode;
use crate::model::{Model, Payload};
use crate::protocol::{encode_internal_error, encode_response, BoxError, MethodInfo, PanicError, RpcError, TrellisError};
use crate::transport::ConnectionState;
use crate::validation::ValidationContext;

/// Server-side envelope of one inbound call.
#[derive(Debug)]
pub struct IncomingRpc {
    rpc: Rpc,
    trace_id_is_received: bool,
    remote_addr: Option<SocketAddr>,
    forwarded_for: Option<String>,
    internal_error: Option<BoxError>,
    stack_trace: Option<String>,
    encode_resp_error: Option<serde_json::Error>,
    write_resp_error: Option<TrellisError>,
}

impl Envelope for IncomingRpc {
    fn base(&self) -> &Rpc {
        &self.rpc
    }
}

impl IncomingRpc {
    /// Creates the envelope for a received request body. An empty body
    /// leaves `raw_params` unset.
    pub fn new(method: &'static MethodInfo, trace_id: String, trace_id_is_received: bool, body: Bytes) -> Self {
        let mut rpc = Rpc::new(method, trace_id);
        if !body.is_empty() {
            rpc.raw_params = Some(body);
        }
        Self {
            rpc,
            trace_id_is_received,
            remote_addr: None,
            forwarded_for: None,
            internal_error: None,
            stack_trace: None,
            encode_resp_error: None,
            write_resp_error: None,
        }
    }

    /// Records the peer address and the raw `X-Forwarded-For` header.
    pub fn set_remote(&mut self, remote_addr: Option<SocketAddr>, forwarded_for: Option<String>) {
        self.remote_addr = remote_addr;
        self.forwarded_for = forwarded_for;
    }

    pub fn trace_id_is_received(&self) -> bool {
        self.trace_id_is_received
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Client IP: the first `X-Forwarded-For` hop if present, otherwise the
    /// peer address.
    pub fn remote_ip(&self) -> Option<IpAddr> {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|value| value.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        forwarded.or_else(|| self.remote_addr.map(|addr| addr.ip()))
    }

    /// Underlying cause of an internal error; always kept, whatever the debug mode.
    pub fn internal_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.internal_error.as_deref()
    }

    /// Stack trace of a recovered panic
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    pub fn encode_resp_error(&self) -> Option<&serde_json::Error> {
        self.encode_resp_error.as_ref()
    }

    /// Set when the response could not be handed to the connection.
    pub fn write_resp_error(&self) -> Option<&TrellisError> {
        self.write_resp_error.as_ref()
    }

    /// Records a write failure if the connection closed before the response
    /// was ready. Returns whether the response can still be written.
    pub fn check_connection(&mut self, connection: &ConnectionState) -> bool {
        if connection.is_closed() {
            self.write_resp_error = Some(TrellisError::Transport(
                "connection closed before the response was written".to_string(),
            ));
            return false;
        }
        true
    }

    pub fn results_mut(&mut self) -> Option<&mut Payload> {
        self.rpc.results.as_mut()
    }

    pub fn set_results(&mut self, results: Payload) {
        self.rpc.results = Some(results);
    }

    /// Decodes and validates the raw params as `P`.
    ///
    /// Returns `false` with the error set when the body is not JSON (parse
    /// error), does not fit `P` or fails validation (invalid params).
    /// Methods without params ignore the body.
    pub fn decode_params<P: Model>(&mut self) -> bool {
        if P::IS_EMPTY {
            return true;
        }
        let raw = self.rpc.raw_params.as_deref().unwrap_or_default();
        let params = match Payload::decode::<P>(raw) {
            Ok(params) => params,
            Err(err) => {
                match err.classify() {
                    Category::Syntax | Category::Eof => {
                        self.rpc.error = Some(RpcError::parse_error().with_details(err.to_string()));
                    }
                    Category::Data => {
                        self.rpc.error = Some(RpcError::invalid_params().with_details(err.to_string()));
                    }
                    Category::Io => self.save_error(Box::new(err)),
                }
                return false;
            }
        };
        let mut vc = ValidationContext::new();
        let valid = params.validate(&mut vc);
        self.rpc.params = Some(params);
        if !valid {
            self.rpc.error = Some(RpcError::invalid_params().with_details(vc.error_details()));
            return false;
        }
        true
    }

    /// Classifies an error returned by the chain.
    ///
    /// A top-level [`RpcError`] is reported verbatim. A [`PanicError`] and any
    /// other error become an internal error whose detail is only exposed in
    /// debug mode.
    pub fn save_error(&mut self, err: BoxError) {
        let err = match err.downcast::<RpcError>() {
            Ok(rpc_error) => {
                self.rpc.error = Some(*rpc_error);
                return;
            }
            Err(err) => err,
        };
        match err.downcast::<PanicError>() {
            Ok(panic) => self.save_panic(*panic),
            Err(err) => {
                let mut error = RpcError::internal_error();
                if debug_mode() {
                    error.details = err.to_string();
                }
                self.rpc.error = Some(error);
                self.internal_error = Some(err);
            }
        }
    }

    fn save_panic(&mut self, panic: PanicError) {
        let mut error = RpcError::internal_error();
        if debug_mode() {
            error.details = panic.message.clone();
            error.set_data("stackTrace", panic.stack_trace.clone());
        }
        self.rpc.error = Some(error);
        self.stack_trace = Some(panic.stack_trace.clone());
        self.internal_error = Some(Box::new(panic));
    }

    /// Encodes the response body and keeps it as the raw response.
    ///
    /// A results encoding failure replaces the outcome with an internal error.
    /// If the envelope itself cannot be encoded, a bare internal error is sent.
    pub fn encode_response(&mut self) -> Bytes {
        let pretty = debug_mode();
        let mut results = None;
        if self.rpc.error.is_none() {
            if let Some(payload) = &self.rpc.results {
                match payload.to_value() {
                    Ok(value) => results = Some(value),
                    Err(err) => {
                        let mut error = RpcError::internal_error();
                        if debug_mode() {
                            error.details = err.to_string();
                        }
                        self.rpc.error = Some(error);
                        self.encode_resp_error = Some(err);
                    }
                }
            }
        }
        let body = match encode_response(&self.rpc.trace_id, self.rpc.error.as_ref(), results.as_ref(), pretty) {
            Ok(body) => body,
            Err(err) => {
                self.rpc.error = Some(RpcError::internal_error());
                self.encode_resp_error = Some(err);
                encode_internal_error(&self.rpc.trace_id)
            }
        };
        self.rpc.raw_resp = Some(body.clone());
        body
    }
}

/// [`filter_fn`] specialised to server-side envelopes.
pub fn incoming_filter<F>(name: impl Into<String>, f: F) -> Filter<IncomingRpc>
where
    F: for<'a> Fn(&'a mut IncomingRpc, Next<'a, IncomingRpc>) -> BoxFuture<'a, RpcResult> + Send + Sync + 'static,
{
    filter_fn(name, f)
}
