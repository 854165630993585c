//! Trellis Common - Shared runtime types for the trellis RPC framework
//!
//! This crate provides everything the server and client sides have in
//! common: the error taxonomy and response envelope codec, method identity,
//! the incoming and outgoing RPC envelopes, the filter chain and transport
//! middleware composition, trace-ID propagation and the validation engine
//! used by generated data types.
//!
//! # Wire protocol
//!
//! Each method is served at `POST /rpc/{Namespace}.{Service}.{Method}`. The
//! request body is the JSON-encoded params object (empty for methods without
//! params). The response is always HTTP 200 with a JSON body:
//!
//! ```text
//! {"traceID": "...", "results": {...}}
//! {"traceID": "...", "error": {"code": -32602, "message": "invalid params", "details": "theField: value > 999"}}
//! ```
//!
//! # Components
//!
//! - **[`protocol`]**: [`RpcError`](protocol::RpcError), [`TrellisError`](protocol::TrellisError),
//!   [`MethodInfo`](protocol::MethodInfo) and the envelope codec
//! - **[`validation`]**: [`Validate`](validation::Validate) and the path-tracking
//!   [`ValidationContext`](validation::ValidationContext)
//! - **[`model`]**: the [`Model`](model::Model) bound and the type-erased [`Payload`](model::Payload)
//! - **[`rpc`]**: [`IncomingRpc`](rpc::IncomingRpc) and [`OutgoingRpc`](rpc::OutgoingRpc)
//! - **[`chain`]**: RPC filters, terminal handlers, middleware and table building
//! - **[`transport`]**: raw HTTP handler/sender types
//! - **[`trace`]**: trace-ID generation and ambient propagation
//! - **[`debug`]**: the process-wide debug switch
//!
//! # Example
//!
//! ```
//! use trellis_common::validation::{check_int_range, Validate, ValidationContext};
//! use trellis_common::model::{Model, Payload};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct DoSomethingParams {
//!     the_field: i32,
//! }
//!
//! impl Validate for DoSomethingParams {
//!     fn validate(&self, vc: &mut ValidationContext) -> bool {
//!         vc.enter("theField");
//!         if !check_int_range(vc, self.the_field, Some(100), Some(999)) {
//!             return false;
//!         }
//!         vc.leave();
//!         true
//!     }
//! }
//!
//! impl Model for DoSomethingParams {}
//!
//! let params = Payload::decode::<DoSomethingParams>(br#"{"theField":1000}"#).unwrap();
//! let mut vc = ValidationContext::new();
//! assert!(!params.validate(&mut vc));
//! assert_eq!(vc.error_details(), "theField: value > 999");
//! ```

pub mod chain;
pub mod debug;
pub mod model;
pub mod protocol;
pub mod rpc;
pub mod trace;
pub mod transport;
pub mod validation;

pub use protocol::*;
