//! Trellis Client
//!
//! This crate provides the client core used by generated client stubs:
//! [`Client`] runs a method's outgoing filters around the HTTP send, with the
//! transport wrapped in the method's middleware, and decodes and validates
//! the results. The default transport is a hyper client; any
//! [`HttpSender`](trellis_common::transport::HttpSender) can replace it.

pub mod client;
pub mod logger;
pub mod options;
pub mod transport;

pub use client::Client;
pub use logger::OutgoingRpcLogger;
pub use options::{ClientMiddleware, ClientOptions};
pub use transport::hyper_transport;
