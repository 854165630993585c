//! Trellis - JSON-over-HTTP RPC runtime
//!
//! Trellis is the runtime behind generated RPC services and clients. Each
//! method is served at `POST /rpc/{Namespace}.{Service}.{Method}` and always
//! answers HTTP 200 with either `{"traceID", "results"}` or
//! `{"traceID", "error"}`.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`common`]: envelopes, filter chain, errors, trace IDs and validation
//! - [`server`]: router, service registration and the hyper server
//! - [`client`]: the client core and hyper transport
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis::client::{Client, ClientOptions};
//! use trellis::common::protocol::MethodInfo;
//! use trellis::server::{HttpServer, Router, ServerOptions, ServiceRegistrar};
//!
//! static PING: MethodInfo = MethodInfo::new("Foo", "Health", "Ping", "Foo.Health.Ping", 0);
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!     let mut registrar = ServiceRegistrar::new(&mut router, 1, &ServerOptions::default());
//!     registrar.register::<(), (), _, _>(&PING, |()| async { Ok(()) }).unwrap();
//!     tokio::spawn(HttpServer::new(Arc::new(router)).run("127.0.0.1:8080".parse().unwrap()));
//!
//!     let client = Client::new("http://127.0.0.1:8080", 1, ClientOptions::default());
//!     client.call::<(), ()>(&PING, ()).await.unwrap();
//! }
//! ```

pub use trellis_client as client;
pub use trellis_common as common;
pub use trellis_server as server;
