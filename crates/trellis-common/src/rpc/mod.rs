//! RPC envelopes
//!
//! [`Rpc`] is the state shared by both directions of a call: method
//! identity, the typed params and results, the trace ID, raw bodies and the
//! error. [`IncomingRpc`] (server) and [`OutgoingRpc`] (client) each own one
//! and add their own fields. Filters reach the shared state through the
//! [`Envelope`] trait.
//!
//! After a call completes either `error()` is `None` and the results are
//! populated (for methods that have results), or `error()` is set and the
//! results must be ignored.

pub mod incoming;
pub mod outgoing;

use std::borrow::Cow;

use bytes::Bytes;

use crate::debug::debug_mode;
use crate::model::Payload;
use crate::protocol::{MethodInfo, RpcError};

pub use incoming::{incoming_filter, IncomingRpc};
pub use outgoing::{outgoing_filter, OutgoingRpc};

/// State shared by incoming and outgoing calls.
#[derive(Debug)]
pub struct Rpc {
    pub(crate) method: &'static MethodInfo,
    pub(crate) params: Option<Payload>,
    pub(crate) results: Option<Payload>,
    pub(crate) trace_id: String,
    pub(crate) raw_params: Option<Bytes>,
    pub(crate) raw_resp: Option<Bytes>,
    pub(crate) error: Option<RpcError>,
}

impl Rpc {
    pub(crate) fn new(method: &'static MethodInfo, trace_id: String) -> Self {
        Self {
            method,
            params: None,
            results: None,
            trace_id,
            raw_params: None,
            raw_resp: None,
            error: None,
        }
    }
}

/// Read access to the shared envelope state, implemented by both directions.
pub trait Envelope {
    fn base(&self) -> &Rpc;

    fn method(&self) -> &'static MethodInfo {
        self.base().method
    }

    fn namespace(&self) -> &'static str {
        self.base().method.namespace
    }

    fn service_name(&self) -> &'static str {
        self.base().method.service_name
    }

    fn method_name(&self) -> &'static str {
        self.base().method.method_name
    }

    fn full_method_name(&self) -> &'static str {
        self.base().method.full_method_name
    }

    /// `None` for methods without params
    fn params(&self) -> Option<&Payload> {
        self.base().params.as_ref()
    }

    /// `None` until the call produced results, and for methods without results
    fn results(&self) -> Option<&Payload> {
        self.base().results.as_ref()
    }

    /// Empty until assigned
    fn trace_id(&self) -> &str {
        &self.base().trace_id
    }

    fn raw_params(&self) -> Option<&Bytes> {
        self.base().raw_params.as_ref()
    }

    fn raw_resp(&self) -> Option<&Bytes> {
        self.base().raw_resp.as_ref()
    }

    fn error(&self) -> Option<&RpcError> {
        self.base().error.as_ref()
    }
}

/// Renders a raw body for logging, truncated to `max_size` bytes unless
/// debug mode is on.
pub fn loggable_body(raw: Option<&Bytes>, max_size: usize) -> Cow<'_, str> {
    let Some(raw) = raw else {
        return Cow::Borrowed("");
    };
    if debug_mode() || raw.len() <= max_size {
        return String::from_utf8_lossy(raw);
    }
    let mut truncated = String::from_utf8_lossy(&raw[..max_size]).into_owned();
    truncated.push_str("...");
    Cow::Owned(truncated)
}
