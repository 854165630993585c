use bytes::Bytes;
use futures::future::BoxFuture;
use serde_json::Value;

use super::{Envelope, Rpc};
use crate::chain::{filter_fn, Filter, Next, RpcResult};
use crate::model::{Model, Payload};
use crate::protocol::{decode_response, MethodInfo, TrellisError};
use crate::trace::current_trace_id;
use crate::transport::HttpSender;

type ResultsDecoder = fn(Option<Value>) -> serde_json::Result<Payload>;

fn decode_results<R: Model>(value: Option<Value>) -> serde_json::Result<Payload> {
    match value {
        Some(value) => Payload::from_value::<R>(value),
        None => Ok(Payload::new(R::default())),
    }
}

/// Client-side envelope of one outbound call.
pub struct OutgoingRpc {
    rpc: Rpc,
    url: String,
    status_code: Option<u16>,
    sender: Option<HttpSender>,
    results_decoder: Option<ResultsDecoder>,
}

impl Envelope for OutgoingRpc {
    fn base(&self) -> &Rpc {
        &self.rpc
    }
}

impl OutgoingRpc {
    /// Creates the envelope for a call to `method` at `url`.
    ///
    /// The trace ID is inherited from the inbound call being handled by the
    /// current task, and left empty otherwise.
    pub fn new<P: Model, R: Model>(method: &'static MethodInfo, url: impl Into<String>, params: P) -> Self {
        let mut rpc = Rpc::new(method, current_trace_id().unwrap_or_default());
        if !P::IS_EMPTY {
            rpc.params = Some(Payload::new(params));
        }
        Self {
            rpc,
            url: url.into(),
            status_code: None,
            sender: None,
            results_decoder: if R::IS_EMPTY { None } else { Some(decode_results::<R> as ResultsDecoder) },
        }
    }

    pub fn with_sender(mut self, sender: HttpSender) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status, once a response was received
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Transport the terminal stage sends through
    pub fn sender(&self) -> Option<&HttpSender> {
        self.sender.as_ref()
    }

    pub fn params_mut(&mut self) -> Option<&mut Payload> {
        self.rpc.params.as_mut()
    }

    pub fn take_results(&mut self) -> Option<Payload> {
        self.rpc.results.take()
    }

    /// Encodes the params into the raw request body. Methods without params
    /// send an empty body.
    pub fn encode_params(&mut self) -> serde_json::Result<Bytes> {
        let body = match &self.rpc.params {
            Some(params) => Bytes::from(params.encode()?),
            None => Bytes::new(),
        };
        self.rpc.raw_params = Some(body.clone());
        Ok(body)
    }

    /// Reads a response: checks the status, adopts the trace ID assigned by
    /// the server and decodes either the error or the results.
    pub fn read_response(&mut self, status: u16, body: Bytes) -> RpcResult {
        self.status_code = Some(status);
        self.rpc.raw_resp = Some(body.clone());
        if status != 200 {
            return Err(Box::new(TrellisError::UnexpectedStatus(status)));
        }
        let envelope = decode_response(&body)?;
        if !envelope.trace_id.is_empty() {
            self.rpc.trace_id = envelope.trace_id;
        }
        if let Some(error) = envelope.error {
            self.rpc.error = Some(error.clone());
            return Err(Box::new(error));
        }
        if let Some(decoder) = self.results_decoder {
            self.rpc.results = Some(decoder(envelope.results)?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for OutgoingRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingRpc")
            .field("rpc", &self.rpc)
            .field("url", &self.url)
            .field("status_code", &self.status_code)
            .finish_non_exhaustive()
    }
}

/// [`filter_fn`] specialised to client-side envelopes.
pub fn outgoing_filter<F>(name: impl Into<String>, f: F) -> Filter<OutgoingRpc>
where
    F: for<'a> Fn(&'a mut OutgoingRpc, Next<'a, OutgoingRpc>) -> BoxFuture<'a, RpcResult> + Send + Sync + 'static,
{
    filter_fn(name, f)
}
